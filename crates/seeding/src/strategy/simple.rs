//! Single-datacenter seed selection.
//!
//! Existing seeds that are still contenders are kept first; the remaining
//! slots go to other contenders in id order. Re-running with the same inputs
//! gives the same seeds, so repeated or out-of-order notifications are
//! harmless.

use std::collections::BTreeSet;

use corelib::NodeId;

use crate::strategy::{flatten, Candidates, SeedStrategy};

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleSeedStrategy;

/// `(current ∩ contenders) ∪ contenders`, truncated to `num`.
pub fn trim(num: usize, current: &BTreeSet<NodeId>, contenders: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    current
        .intersection(contenders)
        .chain(contenders.difference(current))
        .take(num)
        .copied()
        .collect()
}

impl SeedStrategy for SimpleSeedStrategy {
    fn is_quorate(&self, quorum_size: usize, potential: &Candidates) -> bool {
        flatten(potential).len() >= quorum_size
    }

    fn select(
        &self,
        num: usize,
        current: &BTreeSet<NodeId>,
        contenders: &Candidates,
    ) -> BTreeSet<NodeId> {
        trim(num, current, &flatten(contenders))
    }

    fn name(&self) -> &'static str {
        "SimpleSeedStrategy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> BTreeSet<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn test_trim_prefers_existing_seeds() {
        let current = ids(&[5, 9]);
        let contenders = ids(&[1, 2, 3, 9]);
        assert_eq!(trim(2, &current, &contenders), ids(&[1, 9]));
        assert_eq!(trim(1, &current, &contenders), ids(&[9]));
    }

    #[test]
    fn test_trim_drops_dead_seeds() {
        assert_eq!(trim(2, &ids(&[7, 8]), &ids(&[1, 2, 3])), ids(&[1, 2]));
    }

    #[test]
    fn test_trim_is_idempotent() {
        let current = ids(&[4]);
        let contenders = ids(&[1, 2, 4, 6]);
        let once = trim(3, &current, &contenders);
        assert_eq!(trim(3, &current, &contenders), once);
        assert_eq!(trim(3, &once, &contenders), once);
    }

    #[test]
    fn test_quorate_counts_all_groups() {
        let mut potential = Candidates::new();
        potential.insert("dc".into(), ids(&[1]));
        assert!(!SimpleSeedStrategy.is_quorate(2, &potential));
        potential.insert("other".into(), ids(&[2]));
        assert!(SimpleSeedStrategy.is_quorate(2, &potential));
    }
}
