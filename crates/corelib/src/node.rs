//! Node abstractions for the token ring.
//!
//! Nodes are owned by the lifecycle subsystem. This crate only reads the
//! health attributes below and writes `tokens`. They are identified by a
//! compact `NodeId` that is cheap to compare and hash.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lifecycle::Lifecycle;
use crate::token::Token;

/// Opaque identifier for a node in the cluster.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Health snapshot of one storage node.
///
/// Keep this struct small and cheap to clone; connections and metrics live
/// with the lifecycle subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Known once the machine is provisioned.
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub service_up: bool,
    #[serde(default)]
    pub service_state: Lifecycle,
    #[serde(default = "default_managed")]
    pub managed: bool,
    #[serde(default)]
    pub tokens: BTreeSet<Token>,
    /// Physical datacenter name as reported by the store.
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default)]
    pub rack: Option<String>,
    #[serde(default)]
    pub thrift_port: Option<u16>,
}

fn default_managed() -> bool {
    true
}

impl Node {
    /// A freshly created, managed node with nothing reported yet.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            hostname: None,
            service_up: false,
            service_state: Lifecycle::Created,
            managed: true,
            tokens: BTreeSet::new(),
            datacenter: None,
            rack: None,
            thrift_port: None,
        }
    }

    pub fn with_topology(
        id: NodeId,
        datacenter: impl Into<String>,
        rack: impl Into<String>,
    ) -> Self {
        Self {
            datacenter: Some(datacenter.into()),
            rack: Some(rack.into()),
            ..Self::new(id)
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Marks the node as started and serving.
    pub fn running(mut self) -> Self {
        self.service_state = Lifecycle::Running;
        self.service_up = true;
        self
    }

    pub fn with_tokens(mut self, tokens: impl IntoIterator<Item = Token>) -> Self {
        self.tokens = tokens.into_iter().collect();
        self
    }
}
