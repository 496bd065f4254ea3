//! Which physical datacenter each node reports belonging to.

use std::collections::{BTreeMap, BTreeSet};

use corelib::{Node, NodeId};
use serde::Serialize;

/// Physical datacenter name to the nodes reporting it.
///
/// Rebuilt from scratch on every membership change rather than edited in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DatacenterUsage(BTreeMap<String, BTreeSet<NodeId>>);

impl DatacenterUsage {
    pub fn from_members<'a>(members: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut usage: BTreeMap<String, BTreeSet<NodeId>> = BTreeMap::new();
        for node in members {
            if let Some(name) = &node.datacenter {
                usage.entry(name.clone()).or_default().insert(node.id);
            }
        }
        DatacenterUsage(usage)
    }

    /// Union of several usages, as seen by a fabric.
    pub fn merge<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = DatacenterUsage>,
    {
        let mut merged: BTreeMap<String, BTreeSet<NodeId>> = BTreeMap::new();
        for part in parts {
            for (name, nodes) in part.0 {
                merged.entry(name).or_default().extend(nodes);
            }
        }
        DatacenterUsage(merged)
    }

    pub fn datacenters(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    pub fn nodes_in(&self, datacenter: &str) -> Option<&BTreeSet<NodeId>> {
        self.0.get(datacenter)
    }

    pub fn datacenter_of(&self, node: NodeId) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, nodes)| nodes.contains(&node))
            .map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, dc: &str) -> Node {
        Node::with_topology(NodeId(id), dc, "r1")
    }

    #[test]
    fn test_from_members_skips_unreported() {
        let members = vec![node(1, "us-east"), node(2, "us-east"), Node::new(NodeId(3))];
        let usage = DatacenterUsage::from_members(&members);
        assert_eq!(usage.datacenters(), ["us-east".to_string()].into_iter().collect());
        assert_eq!(usage.nodes_in("us-east").map(|s| s.len()), Some(2));
        assert_eq!(usage.datacenter_of(NodeId(3)), None);
    }

    #[test]
    fn test_merge() {
        let a = DatacenterUsage::from_members(&[node(1, "eu")]);
        let b = DatacenterUsage::from_members(&[node(2, "eu"), node(3, "us")]);
        let merged = DatacenterUsage::merge([a, b]);
        assert_eq!(merged.datacenters().len(), 2);
        assert_eq!(merged.datacenter_of(NodeId(2)), Some("eu"));
        assert_eq!(merged.nodes_in("eu").map(|s| s.len()), Some(2));
    }
}
