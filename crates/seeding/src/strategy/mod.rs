//! Seed selection strategies.
//!
//! A strategy decides when enough candidates exist to publish seeds for the
//! first time, and which candidates to keep as seeds:
//!
//! - **SimpleSeedStrategy**: one datacenter; keep existing seeds, top up
//! - **NetworkTopologySeedStrategy**: many datacenters; at least one seed per
//!   datacenter before topping up

pub mod network_topology;
pub mod simple;

pub use network_topology::NetworkTopologySeedStrategy;
pub use simple::SimpleSeedStrategy;

use std::collections::{BTreeMap, BTreeSet};

use corelib::NodeId;

/// Seed candidates keyed by the datacenter they belong to.
pub type Candidates = BTreeMap<String, BTreeSet<NodeId>>;

/// All candidates regardless of datacenter.
pub fn flatten(candidates: &Candidates) -> BTreeSet<NodeId> {
    candidates.values().flatten().copied().collect()
}

/// Trait for seed selection strategies.
///
/// Implementations must be deterministic: the same `current`, `contenders`
/// and `num` always give the same seeds.
pub trait SeedStrategy: Send + Sync + 'static {
    /// Whether a group that has never published may publish now.
    fn is_quorate(&self, quorum_size: usize, potential: &Candidates) -> bool;

    /// Choose at most `num` seeds from `contenders`, preferring `current`.
    fn select(
        &self,
        num: usize,
        current: &BTreeSet<NodeId>,
        contenders: &Candidates,
    ) -> BTreeSet<NodeId>;

    /// Get the strategy name (for logging/debugging).
    fn name(&self) -> &'static str;
}
