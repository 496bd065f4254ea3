//! A fabric of datacenters electing one seed set for all of them.
//!
//! Attached datacenters stop electing seeds themselves and adopt the
//! fabric's. The fabric never holds its own lock while calling into a
//! child's `update()`; a child may read the fabric's seeds while holding
//! its own state lock.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use corelib::{Lifecycle, NodeId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::FabricConfig;
use crate::datacenter::DatacenterCoordinator;
use crate::elector::{ElectionInput, SeedElector};
use crate::error::{Result, SeedingError};
use crate::publish::{Attribute, AttributeChange, AttributeSink, NullSink};
use crate::quorum::fabric_quorum_size;
use crate::strategy::{Candidates, NetworkTopologySeedStrategy};
use crate::usage::DatacenterUsage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FabricSnapshot {
    pub name: String,
    pub lifecycle: Lifecycle,
    pub quorum_size: usize,
    pub current_seeds: BTreeSet<NodeId>,
    pub has_published_seeds: bool,
    pub potential_seeds: Candidates,
    pub potential_running_seeds: Candidates,
    pub datacenters: Vec<String>,
    pub datacenter_usage: DatacenterUsage,
}

struct FabricState {
    elector: SeedElector<NetworkTopologySeedStrategy>,
    lifecycle: Lifecycle,
    usage: DatacenterUsage,
}

pub struct FabricCoordinator {
    name: String,
    config: FabricConfig,
    state: Mutex<FabricState>,
    datacenters: RwLock<Vec<Arc<DatacenterCoordinator>>>,
    sink: Arc<dyn AttributeSink>,
}

impl std::fmt::Debug for FabricCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FabricCoordinator")
            .field("name", &self.name)
            .field("datacenters", &self.datacenter_names())
            .finish_non_exhaustive()
    }
}

fn check_unique(existing: &[Arc<DatacenterCoordinator>], candidate: &DatacenterCoordinator) -> Result<()> {
    if existing.iter().any(|d| d.name() == candidate.name()) {
        return Err(SeedingError::DuplicateDatacenter(candidate.name().to_string()));
    }
    if let Some(other) = candidate.fabric() {
        return Err(SeedingError::InvalidConfig(format!(
            "datacenter {} already belongs to fabric {}",
            candidate.name(),
            other.name()
        )));
    }
    Ok(())
}

impl FabricCoordinator {
    /// Attaches `datacenters` and runs a first `update()`.
    ///
    /// The seed quorum is sized from the datacenters present here and is not
    /// recomputed when datacenters are added or removed later.
    pub fn new(
        name: impl Into<String>,
        config: FabricConfig,
        datacenters: Vec<Arc<DatacenterCoordinator>>,
        sink: Arc<dyn AttributeSink>,
    ) -> Result<Arc<Self>> {
        let mut members: Vec<Arc<DatacenterCoordinator>> = Vec::with_capacity(datacenters.len());
        for dc in datacenters {
            check_unique(&members, &dc)?;
            members.push(dc);
        }
        let quorum_size = fabric_quorum_size(
            members.iter().map(|d| d.initial_size()),
            config.initial_quorum_size,
        );
        let name = name.into();
        info!(
            fabric = %name,
            quorum_size,
            datacenters = members.len(),
            "created fabric"
        );

        let fabric = Arc::new_cyclic(|weak: &Weak<FabricCoordinator>| {
            for dc in &members {
                dc.attach_fabric(weak.clone());
            }
            Self {
                name,
                config,
                state: Mutex::new(FabricState {
                    elector: SeedElector::new(NetworkTopologySeedStrategy, quorum_size),
                    lifecycle: Lifecycle::Created,
                    usage: DatacenterUsage::default(),
                }),
                datacenters: RwLock::new(members),
                sink,
            }
        });
        fabric.update();
        Ok(fabric)
    }

    pub fn standalone(
        name: impl Into<String>,
        config: FabricConfig,
        datacenters: Vec<Arc<DatacenterCoordinator>>,
    ) -> Result<Arc<Self>> {
        Self::new(name, config, datacenters, Arc::new(NullSink))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &FabricConfig {
        &self.config
    }

    pub fn quorum_size(&self) -> usize {
        self.state.lock().elector.quorum_size()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    pub fn current_seeds(&self) -> BTreeSet<NodeId> {
        self.state.lock().elector.current_seeds().clone()
    }

    pub fn has_published_seeds(&self) -> bool {
        self.state.lock().elector.has_published_seeds()
    }

    pub fn datacenter_usage(&self) -> DatacenterUsage {
        self.state.lock().usage.clone()
    }

    /// Child datacenters in attachment order.
    pub fn members(&self) -> Vec<Arc<DatacenterCoordinator>> {
        self.datacenters.read().clone()
    }

    pub fn datacenter(&self, name: &str) -> Option<Arc<DatacenterCoordinator>> {
        self.datacenters.read().iter().find(|d| d.name() == name).cloned()
    }

    fn datacenter_names(&self) -> Vec<String> {
        self.datacenters.read().iter().map(|d| d.name().to_string()).collect()
    }

    pub fn add_datacenter(self: &Arc<Self>, dc: Arc<DatacenterCoordinator>) -> Result<()> {
        {
            let mut datacenters = self.datacenters.write();
            check_unique(&datacenters, &dc)?;
            dc.attach_fabric(Arc::downgrade(self));
            datacenters.push(dc.clone());
        }
        info!(fabric = %self.name, datacenter = %dc.name(), "datacenter joined fabric");
        self.update();
        Ok(())
    }

    /// Detaches `name`, which goes back to electing its own seeds.
    pub fn remove_datacenter(&self, name: &str) -> Result<Arc<DatacenterCoordinator>> {
        let dc = {
            let mut datacenters = self.datacenters.write();
            let index = datacenters
                .iter()
                .position(|d| d.name() == name)
                .ok_or_else(|| SeedingError::UnknownDatacenter(name.to_string()))?;
            datacenters.remove(index)
        };
        dc.detach_fabric();
        info!(fabric = %self.name, datacenter = %name, "datacenter left fabric");
        dc.update();
        self.update();
        Ok(dc)
    }

    /// Viable nodes of every child, keyed by datacenter name.
    ///
    /// A child without viable nodes still gets an (empty) entry.
    pub fn gather_potential_seeds(&self) -> Candidates {
        self.members()
            .iter()
            .map(|d| (d.name().to_string(), d.gather_potential_seeds()))
            .collect()
    }

    pub fn gather_potential_running_seeds(&self) -> Candidates {
        self.members()
            .iter()
            .map(|d| (d.name().to_string(), d.gather_potential_running_seeds()))
            .collect()
    }

    /// Recomputes the fabric's seeds, pushing them down only when they changed.
    pub fn refresh_seeds(&self) {
        if self.refresh_seeds_locked() {
            self.push_down();
        }
    }

    /// Recomputes usage and seeds and always pushes seeds to every child.
    pub fn update(&self) {
        self.refresh_usage();
        self.refresh_seeds_locked();
        self.push_down();
    }

    fn refresh_seeds_locked(&self) -> bool {
        let mut state = self.state.lock();
        let input = ElectionInput {
            potential: self.gather_potential_seeds(),
            potential_running: self.gather_potential_running_seeds(),
            lifecycle: state.lifecycle,
        };
        match state.elector.refresh(&self.name, &input) {
            Some(change) => {
                self.emit(Attribute::CurrentSeeds(change.seeds));
                if change.first_publish {
                    self.emit(Attribute::HasPublishedSeeds(true));
                }
                true
            }
            None => false,
        }
    }

    fn push_down(&self) {
        for dc in self.members() {
            debug!(fabric = %self.name, datacenter = %dc.name(), "pushing seeds to datacenter");
            dc.update();
        }
    }

    /// Unions the children's physical-datacenter usage.
    pub fn refresh_usage(&self) {
        let mut state = self.state.lock();
        let usage = DatacenterUsage::merge(self.members().iter().map(|d| d.datacenter_usage()));
        if usage == state.usage {
            return;
        }
        let datacenters = usage.datacenters();
        if datacenters != state.usage.datacenters() {
            self.emit(Attribute::Datacenters(datacenters));
        }
        self.emit(Attribute::DatacenterUsage(usage.clone()));
        state.usage = usage;
    }

    pub fn set_service_state(&self, lifecycle: Lifecycle) {
        {
            let mut state = self.state.lock();
            if state.lifecycle == lifecycle {
                return;
            }
            debug!(fabric = %self.name, from = %state.lifecycle, to = %lifecycle, "lifecycle changed");
            state.lifecycle = lifecycle;
        }
        self.refresh_seeds();
    }

    fn emit(&self, attribute: Attribute) {
        self.sink.publish(AttributeChange {
            source: self.name.clone(),
            attribute,
        });
    }

    pub fn snapshot(&self) -> FabricSnapshot {
        let state = self.state.lock();
        FabricSnapshot {
            name: self.name.clone(),
            lifecycle: state.lifecycle,
            quorum_size: state.elector.quorum_size(),
            current_seeds: state.elector.current_seeds().clone(),
            has_published_seeds: state.elector.has_published_seeds(),
            potential_seeds: self.gather_potential_seeds(),
            potential_running_seeds: self.gather_potential_running_seeds(),
            datacenters: self.datacenter_names(),
            datacenter_usage: state.usage.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatacenterConfig;
    use corelib::Node;

    fn dc(name: &str, initial_size: usize) -> Arc<DatacenterCoordinator> {
        let config = DatacenterConfig::default().with_initial_size(initial_size);
        DatacenterCoordinator::standalone(name, config).unwrap()
    }

    fn viable(id: u64) -> Node {
        Node::new(NodeId(id)).with_hostname(format!("db-{}", id))
    }

    #[test]
    fn test_quorum_from_initial_sizes() {
        let fabric =
            FabricCoordinator::standalone("f", FabricConfig::default(), vec![dc("a", 3), dc("b", 3)]).unwrap();
        assert_eq!(fabric.quorum_size(), 3);
    }

    #[test]
    fn test_rejects_duplicate_datacenter() {
        let err = FabricCoordinator::standalone("f", FabricConfig::default(), vec![dc("a", 1), dc("a", 1)])
            .unwrap_err();
        assert_eq!(err, SeedingError::DuplicateDatacenter("a".into()));
    }

    #[test]
    fn test_rejects_datacenter_of_other_fabric() {
        let shared = dc("a", 1);
        let _first = FabricCoordinator::standalone("f1", FabricConfig::default(), vec![shared.clone()]).unwrap();
        assert!(FabricCoordinator::standalone("f2", FabricConfig::default(), vec![shared]).is_err());
    }

    #[test]
    fn test_empty_child_still_listed() {
        let a = dc("a", 1);
        let fabric = FabricCoordinator::standalone("f", FabricConfig::default(), vec![a.clone(), dc("b", 1)]).unwrap();
        a.add_member(viable(1));

        let potential = fabric.gather_potential_seeds();
        assert_eq!(potential.len(), 2);
        assert!(potential["b"].is_empty());
        assert!(!fabric.has_published_seeds());
    }

    #[test]
    fn test_remove_reverts_to_local_election() {
        let a = dc("a", 1);
        let fabric = FabricCoordinator::standalone("f", FabricConfig::default(), vec![a.clone()]).unwrap();
        assert!(a.fabric().is_some());

        let removed = fabric.remove_datacenter("a").unwrap();
        assert!(removed.fabric().is_none());
        assert!(fabric.members().is_empty());
        assert_eq!(
            fabric.remove_datacenter("a").unwrap_err(),
            SeedingError::UnknownDatacenter("a".into())
        );

        a.add_member(viable(1));
        assert_eq!(a.current_seeds(), [NodeId(1)].into_iter().collect());
    }
}
