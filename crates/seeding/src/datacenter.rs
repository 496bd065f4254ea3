//! One datacenter: its members, token generator and seed election.
//!
//! # Locking
//!
//! `state` (seeds, lifecycle, published endpoint) is taken first; while it is
//! held the coordinator may read the attached fabric's seeds and then its own
//! `members`. While `members` is held the only lock taken is the token
//! generator's, which is innermost: nothing is locked while it is held.
//! Membership and generator therefore change together.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use corelib::{Lifecycle, Node, NodeId, Token, TokenGenerator};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::DatacenterConfig;
use crate::elector::{ElectionInput, SeedChange, SeedElector};
use crate::error::Result;
use crate::event::NodeEvent;
use crate::fabric::FabricCoordinator;
use crate::membership::{MemberChange, Membership};
use crate::publish::{Attribute, AttributeChange, AttributeSink, NullSink};
use crate::quorum::datacenter_quorum_size;
use crate::strategy::{Candidates, SimpleSeedStrategy};
use crate::usage::DatacenterUsage;
use crate::viability::is_viable_seed;

/// How a newly created member gets its ring positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum TokenAssignment {
    /// Planned positions to configure on the node.
    Explicit(BTreeSet<Token>),
    /// The node picks this many positions itself.
    Vnodes(usize),
    /// Nothing planned; the node picks its own single position.
    Auto,
}

/// What `update()` publishes about reaching the datacenter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Hostname of the first serving member.
    pub hostname: Option<String>,
    pub thrift_port: Option<u16>,
    /// `host:port` of every serving member with both known.
    pub cluster_nodes: Vec<String>,
    pub service_up: bool,
}

impl Endpoint {
    fn from_members(members: &Membership) -> Self {
        let first_up = members.nodes().find(|n| n.service_up);
        let mut cluster_nodes: Vec<String> = members
            .nodes()
            .filter(|n| n.service_up)
            .filter_map(|n| match (&n.hostname, n.thrift_port) {
                (Some(host), Some(port)) => Some(format!("{}:{}", host, port)),
                _ => None,
            })
            .collect();
        cluster_nodes.sort();
        Endpoint {
            hostname: first_up.and_then(|n| n.hostname.clone()),
            thrift_port: first_up.and_then(|n| n.thrift_port),
            service_up: !cluster_nodes.is_empty(),
            cluster_nodes,
        }
    }
}

/// Published state of a datacenter, for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatacenterSnapshot {
    pub name: String,
    pub lifecycle: Lifecycle,
    pub quorum_size: usize,
    pub current_seeds: BTreeSet<NodeId>,
    pub has_published_seeds: bool,
    pub potential_seeds: BTreeSet<NodeId>,
    pub potential_running_seeds: BTreeSet<NodeId>,
    pub members: usize,
    pub live_tokens: BTreeSet<Token>,
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub datacenter_usage: DatacenterUsage,
    pub datacenters: BTreeSet<String>,
    pub fabric: Option<String>,
}

struct DatacenterState {
    elector: SeedElector<SimpleSeedStrategy>,
    lifecycle: Lifecycle,
    endpoint: Endpoint,
    usage: DatacenterUsage,
}

pub struct DatacenterCoordinator {
    name: String,
    config: DatacenterConfig,
    state: Mutex<DatacenterState>,
    members: RwLock<Membership>,
    tokens: Mutex<TokenGenerator>,
    fabric: RwLock<Weak<FabricCoordinator>>,
    sink: Arc<dyn AttributeSink>,
}

impl std::fmt::Debug for DatacenterCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatacenterCoordinator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl DatacenterCoordinator {
    /// Validates `config` and draws the ring origin once.
    pub fn new(
        name: impl Into<String>,
        config: DatacenterConfig,
        sink: Arc<dyn AttributeSink>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let name = name.into();
        let generator = TokenGenerator::from_shift(&config.partitioner, config.token_shift.clone());
        let quorum_size = datacenter_quorum_size(config.initial_size, config.initial_quorum_size);
        debug!(
            datacenter = %name,
            quorum_size,
            partitioner = %config.partitioner,
            origin = %generator.origin(),
            "created datacenter"
        );
        Ok(Arc::new(Self {
            name,
            state: Mutex::new(DatacenterState {
                elector: SeedElector::new(SimpleSeedStrategy, quorum_size),
                lifecycle: Lifecycle::Created,
                endpoint: Endpoint::default(),
                usage: DatacenterUsage::default(),
            }),
            members: RwLock::new(Membership::default()),
            tokens: Mutex::new(generator),
            fabric: RwLock::new(Weak::new()),
            sink,
            config,
        }))
    }

    /// A datacenter whose attributes nobody observes.
    pub fn standalone(name: impl Into<String>, config: DatacenterConfig) -> Result<Arc<Self>> {
        Self::new(name, config, Arc::new(NullSink))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DatacenterConfig {
        &self.config
    }

    pub fn initial_size(&self) -> usize {
        self.config.initial_size
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

    /// Viable members. Reads membership only.
    pub fn gather_potential_seeds(&self) -> BTreeSet<NodeId> {
        self.members.read().potential_seeds()
    }

    /// Viable, serving, RUNNING members. Reads membership only.
    pub fn gather_potential_running_seeds(&self) -> BTreeSet<NodeId> {
        self.members.read().potential_running_seeds()
    }

    /// Reads membership only.
    pub fn datacenter_usage(&self) -> DatacenterUsage {
        self.members.read().usage()
    }

    pub fn member(&self, id: NodeId) -> Option<Node> {
        self.members.read().get(id).cloned()
    }

    pub fn member_count(&self) -> usize {
        self.members.read().len()
    }

    pub fn live_tokens(&self) -> BTreeSet<Token> {
        self.tokens.lock().current_tokens().clone()
    }

    pub fn fabric(&self) -> Option<Arc<FabricCoordinator>> {
        self.fabric.read().upgrade()
    }

    pub(crate) fn attach_fabric(&self, fabric: Weak<FabricCoordinator>) {
        *self.fabric.write() = fabric;
    }

    pub(crate) fn detach_fabric(&self) {
        *self.fabric.write() = Weak::new();
    }

    pub fn add_member(&self, node: Node) {
        self.handle(NodeEvent::Added { node });
    }

    pub fn remove_member(&self, id: NodeId) {
        self.handle(NodeEvent::Removed { id });
    }

    /// Applies one notification and recomputes whatever it can affect.
    ///
    /// Events for nodes that are not members are ignored.
    pub fn handle(&self, event: NodeEvent) {
        let change = {
            let mut members = self.members.write();
            let change = members.apply(&event);
            if let Some(change) = &change {
                self.sync_generator(change);
            }
            change
        };
        let Some(change) = change else {
            debug!(datacenter = %self.name, node = %event.node_id(), "ignoring event for unknown member");
            return;
        };

        if change.datacenter_changed() {
            self.refresh_usage();
        }

        let endpoint = event.affects_endpoint();
        match self.fabric() {
            Some(fabric) if event.affects_viability() => fabric.refresh_seeds(),
            Some(_) => {}
            None if !endpoint && event.affects_viability() => {
                let mut state = self.state.lock();
                if Self::seeds_may_change(&state.elector, &change) {
                    self.refresh_seeds_locked(&mut state);
                } else {
                    trace!(datacenter = %self.name, node = %event.node_id(), "seeds considered stable");
                }
            }
            None => {}
        }
        if endpoint {
            self.update();
        }
    }

    /// Moves the generator's live set from the member's old tokens to its new
    /// ones. Caller holds the membership write lock.
    fn sync_generator(&self, change: &MemberChange) {
        let empty = BTreeSet::new();
        let old = change.before.as_ref().map_or(&empty, |n| &n.tokens);
        let new = change.after.as_ref().map_or(&empty, |n| &n.tokens);
        if old == new {
            return;
        }
        let gone: BTreeSet<Token> = old.difference(new).cloned().collect();
        let added: BTreeSet<Token> = new.difference(old).cloned().collect();
        let mut generator = self.tokens.lock();
        if let Err(err) = generator.record_tokens(&added) {
            warn!(datacenter = %self.name, ?added, %err, "member reported tokens outside the ring");
        }
        generator.shrinking_cluster(&gone);
    }

    /// A recompute can only matter if the member could fill a missing seed
    /// slot, or is a seed that stopped being viable or left.
    fn seeds_may_change(elector: &SeedElector<SimpleSeedStrategy>, change: &MemberChange) -> bool {
        let seeds = elector.current_seeds();
        match (&change.before, &change.after) {
            (Some(before), None) => seeds.contains(&before.id),
            (_, Some(after)) => {
                let viable = is_viable_seed(after);
                let maybe_add = viable && seeds.len() < elector.quorum_size();
                let maybe_remove = seeds.contains(&after.id) && !viable;
                maybe_add || maybe_remove
            }
            (None, None) => false,
        }
    }

    /// Sets the datacenter's own lifecycle and recomputes.
    pub fn set_service_state(&self, lifecycle: Lifecycle) {
        {
            let mut state = self.state.lock();
            if state.lifecycle == lifecycle {
                return;
            }
            debug!(datacenter = %self.name, from = %state.lifecycle, to = %lifecycle, "lifecycle changed");
            state.lifecycle = lifecycle;
        }
        if let Some(fabric) = self.fabric() {
            fabric.refresh_seeds();
        }
        self.update();
    }

    /// Recomputes seeds and the endpoint summary. Idempotent.
    pub fn update(&self) {
        let mut state = self.state.lock();
        self.refresh_seeds_locked(&mut state);

        let endpoint = Endpoint::from_members(&self.members.read());
        if endpoint != state.endpoint {
            self.publish_endpoint(&state.endpoint, &endpoint);
            state.endpoint = endpoint;
        }
    }

    fn refresh_seeds_locked(&self, state: &mut DatacenterState) {
        let change = match self.fabric() {
            Some(fabric) => state.elector.adopt(&self.name, fabric.current_seeds()),
            None => {
                let input = self.election_input(state.lifecycle);
                state.elector.refresh(&self.name, &input)
            }
        };
        if let Some(change) = change {
            self.publish_seeds(change);
        }
    }

    fn election_input(&self, lifecycle: Lifecycle) -> ElectionInput {
        let members = self.members.read();
        let group = |ids: BTreeSet<NodeId>| -> Candidates { [(self.name.clone(), ids)].into_iter().collect() };
        ElectionInput {
            potential: group(members.potential_seeds()),
            potential_running: group(members.potential_running_seeds()),
            lifecycle,
        }
    }

    fn refresh_usage(&self) {
        {
            let mut state = self.state.lock();
            let usage = self.members.read().usage();
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
        if let Some(fabric) = self.fabric() {
            fabric.refresh_usage();
        }
    }

    fn publish_seeds(&self, change: SeedChange) {
        let SeedChange {
            seeds,
            first_publish,
        } = change;
        self.emit(Attribute::CurrentSeeds(seeds));
        if first_publish {
            self.emit(Attribute::HasPublishedSeeds(true));
        }
    }

    fn publish_endpoint(&self, old: &Endpoint, new: &Endpoint) {
        if old.hostname != new.hostname {
            self.emit(Attribute::Hostname(new.hostname.clone()));
        }
        if old.thrift_port != new.thrift_port {
            self.emit(Attribute::ThriftPort(new.thrift_port));
        }
        if old.cluster_nodes != new.cluster_nodes {
            self.emit(Attribute::ClusterNodes(new.cluster_nodes.clone()));
        }
        if old.service_up != new.service_up {
            self.emit(Attribute::ServiceUp(new.service_up));
        }
    }

    fn emit(&self, attribute: Attribute) {
        self.sink.publish(AttributeChange {
            source: self.name.clone(),
            attribute,
        });
    }

    /// Plans ring positions for `delta` members about to be created.
    pub fn grow(&self, delta: usize) -> Result<Vec<TokenAssignment>> {
        if self.config.use_vnodes {
            return Ok(vec![TokenAssignment::Vnodes(self.config.num_tokens_per_node); delta]);
        }
        let mut generator = self.tokens.lock();
        generator.growing_cluster(delta)?;
        let assignments = (0..delta)
            .map(|_| match generator.new_token() {
                Some(token) => TokenAssignment::Explicit([token].into_iter().collect()),
                None => TokenAssignment::Auto,
            })
            .collect();
        debug!(datacenter = %self.name, delta, ?assignments, "planned new members");
        Ok(assignments)
    }

    /// Positions for a node taking over from `id`; `None` if `id` owns none.
    pub fn replacement_tokens(&self, id: NodeId) -> Result<Option<BTreeSet<Token>>> {
        let old = self
            .members
            .read()
            .get(id)
            .map(|n| n.tokens.clone())
            .ok_or(corelib::Error::UnknownNode(id))?;
        if old.is_empty() {
            return Ok(None);
        }
        let replacement = self.tokens.lock().tokens_for_replacement_node(&old)?;
        info!(datacenter = %self.name, node = %id, ?old, ?replacement, "derived replacement tokens");
        Ok(Some(replacement))
    }

    /// Writes `tokens` to member `id` and records them as live.
    pub fn assign_tokens(&self, id: NodeId, tokens: BTreeSet<Token>) -> Result<()> {
        {
            let mut members = self.members.write();
            let node = members.get_mut(id).ok_or(corelib::Error::UnknownNode(id))?;
            let gone: BTreeSet<Token> = node.tokens.difference(&tokens).cloned().collect();
            let added: BTreeSet<Token> = tokens.difference(&node.tokens).cloned().collect();
            let mut generator = self.tokens.lock();
            generator.record_tokens(&added)?;
            generator.shrinking_cluster(&gone);
            node.tokens = tokens.clone();
        }
        self.emit(Attribute::Tokens { node: id, tokens });
        Ok(())
    }

    /// Resynchronises the generator with the tokens members actually own.
    pub fn resync_tokens(&self) -> Result<()> {
        let live = self.members.read().tokens();
        self.tokens.lock().refresh(live)?;
        Ok(())
    }

    pub fn snapshot(&self) -> DatacenterSnapshot {
        let live_tokens = self.live_tokens();
        let state = self.state.lock();
        let fabric = self.fabric().map(|f| f.name().to_string());
        let members = self.members.read();
        let usage = members.usage();
        DatacenterSnapshot {
            name: self.name.clone(),
            lifecycle: state.lifecycle,
            quorum_size: state.elector.quorum_size(),
            current_seeds: state.elector.current_seeds().clone(),
            has_published_seeds: state.elector.has_published_seeds(),
            potential_seeds: members.potential_seeds(),
            potential_running_seeds: members.potential_running_seeds(),
            members: members.len(),
            live_tokens,
            endpoint: state.endpoint.clone(),
            datacenters: usage.datacenters(),
            datacenter_usage: usage,
            fabric,
        }
    }
}
