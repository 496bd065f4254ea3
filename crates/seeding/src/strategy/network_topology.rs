//! Multi-datacenter seed selection.
//!
//! A cluster spanning regions must not bootstrap with every seed in one
//! region, so each datacenter with a contender gets one seed (an existing
//! seed there if there is one) before the remaining slots are filled, existing
//! seeds first.
//!
//! First publication also waits until every datacenter has a contender.

use std::collections::BTreeSet;

use corelib::NodeId;

use crate::strategy::{flatten, Candidates, SeedStrategy};

#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkTopologySeedStrategy;

fn push_unique(chosen: &mut Vec<NodeId>, id: NodeId) {
    if !chosen.contains(&id) {
        chosen.push(id);
    }
}

/// At most `num` seeds: one per datacenter (in name order), then surviving
/// `current` seeds, then any other contenders.
pub fn select_seeds(
    num: usize,
    current: &BTreeSet<NodeId>,
    contenders_by_group: &Candidates,
) -> BTreeSet<NodeId> {
    let mut chosen = Vec::new();
    for group in contenders_by_group.values() {
        let representative = group
            .iter()
            .find(|id| current.contains(id))
            .or_else(|| group.iter().next());
        if let Some(id) = representative {
            push_unique(&mut chosen, *id);
        }
    }
    for group in contenders_by_group.values() {
        for id in group.intersection(current) {
            push_unique(&mut chosen, *id);
        }
    }
    for group in contenders_by_group.values() {
        for id in group {
            push_unique(&mut chosen, *id);
        }
    }
    chosen.into_iter().take(num).collect()
}

impl SeedStrategy for NetworkTopologySeedStrategy {
    fn is_quorate(&self, quorum_size: usize, potential: &Candidates) -> bool {
        !potential.is_empty()
            && potential.values().all(|group| !group.is_empty())
            && flatten(potential).len() >= quorum_size
    }

    fn select(
        &self,
        num: usize,
        current: &BTreeSet<NodeId>,
        contenders: &Candidates,
    ) -> BTreeSet<NodeId> {
        select_seeds(num, current, contenders)
    }

    fn name(&self) -> &'static str {
        "NetworkTopologySeedStrategy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> BTreeSet<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    fn groups(parts: &[(&str, Vec<u64>)]) -> Candidates {
        parts.iter().map(|(name, raw)| (name.to_string(), ids(raw))).collect()
    }

    #[test]
    fn test_one_seed_per_datacenter_first() {
        let contenders = groups(&[("eu", vec![1, 2, 3]), ("us", vec![10, 11])]);
        assert_eq!(select_seeds(2, &BTreeSet::new(), &contenders), ids(&[1, 10]));
        assert_eq!(select_seeds(3, &BTreeSet::new(), &contenders), ids(&[1, 2, 10]));
    }

    #[test]
    fn test_existing_seed_represents_its_datacenter() {
        let contenders = groups(&[("eu", vec![1, 2, 3]), ("us", vec![10, 11])]);
        let current = ids(&[3, 11]);
        assert_eq!(select_seeds(2, &current, &contenders), ids(&[3, 11]));
        assert_eq!(select_seeds(3, &current, &contenders), ids(&[1, 3, 11]));
    }

    #[test]
    fn test_select_is_idempotent() {
        let contenders = groups(&[("a", vec![1, 2]), ("b", vec![3]), ("c", vec![4, 5])]);
        let current = ids(&[5]);
        let once = select_seeds(4, &current, &contenders);
        assert_eq!(select_seeds(4, &current, &contenders), once);
        assert_eq!(select_seeds(4, &once, &contenders), once);
    }

    #[test]
    fn test_quorum_needs_every_datacenter() {
        let strategy = NetworkTopologySeedStrategy;
        assert!(!strategy.is_quorate(1, &Candidates::new()));
        assert!(!strategy.is_quorate(2, &groups(&[("eu", vec![1, 2, 3]), ("us", vec![])])));
        assert!(strategy.is_quorate(2, &groups(&[("eu", vec![1]), ("us", vec![10])])));
    }
}
