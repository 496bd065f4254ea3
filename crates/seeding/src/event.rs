//! Membership and per-attribute change notifications delivered by the bus.

use std::collections::BTreeSet;

use corelib::{Lifecycle, Node, NodeId, Token};
use serde::{Deserialize, Serialize};

/// One notification: a member joined or left, or one attribute changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeEvent {
    Added { node: Node },
    Removed { id: NodeId },
    HostnameChanged { id: NodeId, hostname: Option<String> },
    ServiceUpChanged { id: NodeId, service_up: bool },
    ServiceStateChanged { id: NodeId, state: Lifecycle },
    ManagedChanged { id: NodeId, managed: bool },
    DatacenterNameChanged { id: NodeId, datacenter: Option<String> },
    RackNameChanged { id: NodeId, rack: Option<String> },
    ThriftPortChanged { id: NodeId, port: Option<u16> },
    TokensChanged { id: NodeId, tokens: BTreeSet<Token> },
}

impl NodeEvent {
    pub fn node_id(&self) -> NodeId {
        match self {
            NodeEvent::Added { node } => node.id,
            NodeEvent::Removed { id }
            | NodeEvent::HostnameChanged { id, .. }
            | NodeEvent::ServiceUpChanged { id, .. }
            | NodeEvent::ServiceStateChanged { id, .. }
            | NodeEvent::ManagedChanged { id, .. }
            | NodeEvent::DatacenterNameChanged { id, .. }
            | NodeEvent::RackNameChanged { id, .. }
            | NodeEvent::ThriftPortChanged { id, .. }
            | NodeEvent::TokensChanged { id, .. } => *id,
        }
    }

    /// Events that change what `update()` publishes about the datacenter
    /// endpoint (first up node, `host:port` list).
    pub fn affects_endpoint(&self) -> bool {
        matches!(
            self,
            NodeEvent::Added { .. }
                | NodeEvent::Removed { .. }
                | NodeEvent::HostnameChanged { .. }
                | NodeEvent::ServiceUpChanged { .. }
                | NodeEvent::ThriftPortChanged { .. }
        )
    }

    /// Events that can change a member's seed viability.
    pub fn affects_viability(&self) -> bool {
        matches!(
            self,
            NodeEvent::Added { .. }
                | NodeEvent::Removed { .. }
                | NodeEvent::HostnameChanged { .. }
                | NodeEvent::ServiceUpChanged { .. }
                | NodeEvent::ServiceStateChanged { .. }
                | NodeEvent::ManagedChanged { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_events() {
        let event: NodeEvent = serde_json::from_str(
            r#"{"kind": "service_state_changed", "id": 4, "state": "ON_FIRE"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            NodeEvent::ServiceStateChanged { id: NodeId(4), state: Lifecycle::OnFire }
        );

        let added: NodeEvent =
            serde_json::from_str(r#"{"kind": "added", "node": {"id": 9, "hostname": "db-9"}}"#)
                .unwrap();
        assert_eq!(added.node_id(), NodeId(9));
        assert!(added.affects_endpoint());
    }
}
