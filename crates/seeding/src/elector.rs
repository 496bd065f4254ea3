//! Quorum-gated seed election.
//!
//! High-level logic, applied on every recompute:
//!
//! - Never published: wait until the strategy says the candidates form a
//!   quorum, then publish a trimmed seed set. Publishing flips
//!   `has_published_seeds`, which never flips back.
//! - Published, group STARTING: keep the seeds. Changing seeds mid-startup
//!   risks a split-brain cluster.
//! - Published, nothing running: keep the seeds. Nodes may be between
//!   "started" and "serving".
//! - Otherwise: trim the running candidates, keeping existing seeds first.
//!
//! Once published, the seed set is therefore never emptied.

use std::collections::BTreeSet;

use corelib::{Lifecycle, NodeId};
use tracing::{debug, trace, warn};

use crate::strategy::{flatten, Candidates, SeedStrategy};

/// Everything one recompute reads besides the elector's own state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElectionInput {
    /// Viable nodes.
    pub potential: Candidates,
    /// Viable, serving, RUNNING nodes.
    pub potential_running: Candidates,
    /// Lifecycle of the group doing the election.
    pub lifecycle: Lifecycle,
}

/// A newly published seed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedChange {
    pub seeds: BTreeSet<NodeId>,
    /// True when this change flipped `has_published_seeds`.
    pub first_publish: bool,
}

#[derive(Debug, Clone)]
pub struct SeedElector<S> {
    strategy: S,
    quorum_size: usize,
    current_seeds: BTreeSet<NodeId>,
    has_published_seeds: bool,
}

impl<S: SeedStrategy> SeedElector<S> {
    pub fn new(strategy: S, quorum_size: usize) -> Self {
        Self {
            strategy,
            quorum_size,
            current_seeds: BTreeSet::new(),
            has_published_seeds: false,
        }
    }

    pub fn quorum_size(&self) -> usize {
        self.quorum_size
    }

    pub fn current_seeds(&self) -> &BTreeSet<NodeId> {
        &self.current_seeds
    }

    pub fn has_published_seeds(&self) -> bool {
        self.has_published_seeds
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The seeds `group` should publish given `input`, without publishing.
    pub fn elect(&self, group: &str, input: &ElectionInput) -> BTreeSet<NodeId> {
        let quorum = self.quorum_size;
        if !self.has_published_seeds && !self.strategy.is_quorate(quorum, &input.potential) {
            metrics::counter!("seeding_quorum_waits_total", "group" => group.to_string())
                .increment(1);
            debug!(
                group,
                quorum,
                potentials = flatten(&input.potential).len(),
                "not refreshing seeds: still waiting for quorum"
            );
            return self.current_seeds.clone();
        }

        if !self.has_published_seeds {
            let seeds = self
                .strategy
                .select(quorum, &self.current_seeds, &input.potential);
            debug!(group, ?seeds, strategy = self.strategy.name(), "reached seed quorum");
            return seeds;
        }

        if input.lifecycle == Lifecycle::Starting {
            let potential = flatten(&input.potential);
            if self.current_seeds.is_disjoint(&potential) {
                warn!(
                    group,
                    seeds = ?self.current_seeds,
                    "lost all seeds while starting; subsequent failure likely, but changing seeds during startup would risk split-brain"
                );
            }
            return self.current_seeds.clone();
        }

        if input.potential_running.values().all(BTreeSet::is_empty) {
            warn!(
                group,
                seeds = ?self.current_seeds,
                "no running seeds (yet?); leaving seeds as-is, but risks split-brain if these seeds come back up"
            );
            return self.current_seeds.clone();
        }

        let seeds = self
            .strategy
            .select(quorum, &self.current_seeds, &input.potential_running);
        debug!(group, chosen = ?seeds, "updating seeds from running candidates");
        seeds
    }

    /// Recomputes and publishes; `Some` only if the seed set changed.
    pub fn refresh(&mut self, group: &str, input: &ElectionInput) -> Option<SeedChange> {
        let seeds = self.elect(group, input);
        self.publish(group, seeds)
    }

    /// Takes seeds chosen elsewhere (a fabric). An empty set never replaces
    /// published seeds.
    pub fn adopt(&mut self, group: &str, seeds: BTreeSet<NodeId>) -> Option<SeedChange> {
        if seeds.is_empty() && self.has_published_seeds {
            trace!(group, "ignoring empty delegated seeds; keeping published ones");
            return None;
        }
        self.publish(group, seeds)
    }

    fn publish(&mut self, group: &str, seeds: BTreeSet<NodeId>) -> Option<SeedChange> {
        if seeds == self.current_seeds {
            trace!(group, still = ?seeds, "seed refresh no-op");
            return None;
        }
        debug!(group, now = ?seeds, old = ?self.current_seeds, "refreshing seeds");
        let first_publish = !self.has_published_seeds && !seeds.is_empty();
        if !seeds.is_empty() {
            self.has_published_seeds = true;
        }
        self.current_seeds = seeds.clone();

        metrics::counter!("seeding_seed_changes_total", "group" => group.to_string()).increment(1);
        metrics::gauge!("seeding_current_seeds", "group" => group.to_string())
            .set(seeds.len() as f64);

        Some(SeedChange {
            seeds,
            first_publish,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::SimpleSeedStrategy;

    fn ids(raw: &[u64]) -> BTreeSet<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    fn input(potential: &[u64], running: &[u64], lifecycle: Lifecycle) -> ElectionInput {
        ElectionInput {
            potential: [("dc".to_string(), ids(potential))].into_iter().collect(),
            potential_running: [("dc".to_string(), ids(running))].into_iter().collect(),
            lifecycle,
        }
    }

    #[test]
    fn test_waits_for_quorum() {
        let mut elector = SeedElector::new(SimpleSeedStrategy, 2);
        assert_eq!(elector.refresh("dc", &input(&[1], &[], Lifecycle::Starting)), None);
        assert!(!elector.has_published_seeds());

        let change = elector
            .refresh("dc", &input(&[1, 2], &[], Lifecycle::Starting))
            .unwrap();
        assert_eq!(change.seeds, ids(&[1, 2]));
        assert!(change.first_publish);
        assert!(elector.has_published_seeds());
    }

    #[test]
    fn test_starting_freeze() {
        let mut elector = SeedElector::new(SimpleSeedStrategy, 2);
        elector.refresh("dc", &input(&[1, 2], &[], Lifecycle::Starting));
        assert_eq!(elector.refresh("dc", &input(&[2, 3], &[2, 3], Lifecycle::Starting)), None);
        assert_eq!(elector.current_seeds(), &ids(&[1, 2]));
    }

    #[test]
    fn test_no_running_keeps_seeds() {
        let mut elector = SeedElector::new(SimpleSeedStrategy, 2);
        elector.refresh("dc", &input(&[1, 2], &[], Lifecycle::Running));
        assert_eq!(elector.refresh("dc", &input(&[3], &[], Lifecycle::Running)), None);
        assert_eq!(elector.current_seeds(), &ids(&[1, 2]));
    }

    #[test]
    fn test_running_replaces_dead_seed() {
        let mut elector = SeedElector::new(SimpleSeedStrategy, 2);
        elector.refresh("dc", &input(&[1, 2], &[], Lifecycle::Running));
        let change = elector
            .refresh("dc", &input(&[2, 3], &[2, 3], Lifecycle::Running))
            .unwrap();
        assert_eq!(change.seeds, ids(&[2, 3]));
        assert!(!change.first_publish);
    }

    #[test]
    fn test_adopt_never_empties_published_seeds() {
        let mut elector = SeedElector::new(SimpleSeedStrategy, 1);
        assert_eq!(elector.adopt("dc", BTreeSet::new()), None);
        assert!(elector.adopt("dc", ids(&[4])).is_some());
        assert_eq!(elector.adopt("dc", BTreeSet::new()), None);
        assert_eq!(elector.current_seeds(), &ids(&[4]));
    }
}
