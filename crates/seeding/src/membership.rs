//! Health snapshots of a datacenter's members.

use std::collections::{BTreeMap, BTreeSet};

use corelib::{Node, NodeId, Token};

use crate::event::NodeEvent;
use crate::usage::DatacenterUsage;
use crate::viability::{is_running_seed, is_viable_seed};

/// Before/after view of the member an event touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberChange {
    pub before: Option<Node>,
    pub after: Option<Node>,
}

impl MemberChange {
    pub fn removed(&self) -> Option<&Node> {
        match (&self.before, &self.after) {
            (Some(node), None) => Some(node),
            _ => None,
        }
    }

    pub fn datacenter_changed(&self) -> bool {
        let before = self.before.as_ref().and_then(|n| n.datacenter.as_ref());
        let after = self.after.as_ref().and_then(|n| n.datacenter.as_ref());
        before != after
    }
}

#[derive(Debug, Clone, Default)]
pub struct Membership {
    nodes: BTreeMap<NodeId, Node>,
}

impl Membership {
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Members in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Applies `event`; `None` if it concerns a node that is not a member.
    pub fn apply(&mut self, event: &NodeEvent) -> Option<MemberChange> {
        match event {
            NodeEvent::Added { node } => {
                let before = self.nodes.insert(node.id, node.clone());
                Some(MemberChange {
                    before,
                    after: Some(node.clone()),
                })
            }
            NodeEvent::Removed { id } => {
                let before = self.nodes.remove(id)?;
                Some(MemberChange {
                    before: Some(before),
                    after: None,
                })
            }
            NodeEvent::HostnameChanged { id, hostname } => {
                self.modify(*id, |n| n.hostname = hostname.clone())
            }
            NodeEvent::ServiceUpChanged { id, service_up } => {
                self.modify(*id, |n| n.service_up = *service_up)
            }
            NodeEvent::ServiceStateChanged { id, state } => {
                self.modify(*id, |n| n.service_state = *state)
            }
            NodeEvent::ManagedChanged { id, managed } => self.modify(*id, |n| n.managed = *managed),
            NodeEvent::DatacenterNameChanged { id, datacenter } => {
                self.modify(*id, |n| n.datacenter = datacenter.clone())
            }
            NodeEvent::RackNameChanged { id, rack } => self.modify(*id, |n| n.rack = rack.clone()),
            NodeEvent::ThriftPortChanged { id, port } => self.modify(*id, |n| n.thrift_port = *port),
            NodeEvent::TokensChanged { id, tokens } => {
                self.modify(*id, |n| n.tokens = tokens.clone())
            }
        }
    }

    fn modify(&mut self, id: NodeId, f: impl FnOnce(&mut Node)) -> Option<MemberChange> {
        let node = self.nodes.get_mut(&id)?;
        let before = node.clone();
        f(node);
        Some(MemberChange {
            before: Some(before),
            after: Some(node.clone()),
        })
    }

    pub fn potential_seeds(&self) -> BTreeSet<NodeId> {
        self.nodes().filter(|n| is_viable_seed(n)).map(|n| n.id).collect()
    }

    pub fn potential_running_seeds(&self) -> BTreeSet<NodeId> {
        self.nodes().filter(|n| is_running_seed(n)).map(|n| n.id).collect()
    }

    pub fn usage(&self) -> DatacenterUsage {
        DatacenterUsage::from_members(self.nodes())
    }

    /// Every token owned by a member.
    pub fn tokens(&self) -> BTreeSet<Token> {
        self.nodes().flat_map(|n| n.tokens.iter().cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::Lifecycle;

    #[test]
    fn test_apply_unknown_member_is_ignored() {
        let mut members = Membership::default();
        let change = members.apply(&NodeEvent::ServiceUpChanged {
            id: NodeId(1),
            service_up: true,
        });
        assert!(change.is_none());
        assert!(members.apply(&NodeEvent::Removed { id: NodeId(1) }).is_none());
    }

    #[test]
    fn test_apply_tracks_viability() {
        let mut members = Membership::default();
        members.apply(&NodeEvent::Added { node: Node::new(NodeId(1)) });
        assert!(members.potential_seeds().is_empty());

        members.apply(&NodeEvent::HostnameChanged {
            id: NodeId(1),
            hostname: Some("db-1".into()),
        });
        assert_eq!(members.potential_seeds().len(), 1);
        assert!(members.potential_running_seeds().is_empty());

        members.apply(&NodeEvent::ServiceStateChanged { id: NodeId(1), state: Lifecycle::Running });
        // RUNNING but not serving counts as failed
        assert!(members.potential_seeds().is_empty());

        members.apply(&NodeEvent::ServiceUpChanged { id: NodeId(1), service_up: true });
        assert_eq!(members.potential_running_seeds().len(), 1);
    }

    #[test]
    fn test_removed_change() {
        let mut members = Membership::default();
        members.apply(&NodeEvent::Added { node: Node::new(NodeId(2)) });
        let change = members.apply(&NodeEvent::Removed { id: NodeId(2) }).unwrap();
        assert_eq!(change.removed().map(|n| n.id), Some(NodeId(2)));
        assert!(members.is_empty());
    }
}
