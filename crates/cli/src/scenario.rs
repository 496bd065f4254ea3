//! Replays a JSON scenario against real coordinators.
//!
//! ```json
//! {
//!   "fabric": { "name": "global" },
//!   "datacenters": [{ "name": "east", "config": { "initial_size": 2 } }],
//!   "steps": [
//!     { "action": "event", "datacenter": "east",
//!       "event": { "kind": "added", "node": { "id": 1, "hostname": "db-1" } } },
//!     { "action": "grow", "datacenter": "east", "delta": 2 }
//!   ]
//! }
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use corelib::{Lifecycle, NodeId, Token};
use seeding::{
    AttributeChange, ChannelSink, DatacenterConfig, DatacenterCoordinator, DatacenterSnapshot,
    FabricConfig, FabricCoordinator, FabricSnapshot, NodeEvent, SeedingError, TokenAssignment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub fabric: Option<FabricSetup>,
    pub datacenters: Vec<DatacenterSetup>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FabricSetup {
    pub name: String,
    #[serde(default)]
    pub config: FabricConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatacenterSetup {
    pub name: String,
    #[serde(default)]
    pub config: DatacenterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Event {
        datacenter: String,
        event: NodeEvent,
    },
    /// Sets a datacenter's lifecycle, or the fabric's when `datacenter` is absent.
    ServiceState {
        #[serde(default)]
        datacenter: Option<String>,
        state: Lifecycle,
    },
    Grow {
        datacenter: String,
        delta: usize,
    },
    Replace {
        datacenter: String,
        node: NodeId,
    },
    AssignTokens {
        datacenter: String,
        node: NodeId,
        tokens: BTreeSet<Token>,
    },
    /// Explicit recompute of a datacenter, or of the fabric when absent.
    Update {
        #[serde(default)]
        datacenter: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepOutcome {
    Grow {
        datacenter: String,
        assignments: Vec<TokenAssignment>,
    },
    Replace {
        datacenter: String,
        node: NodeId,
        tokens: Option<BTreeSet<Token>>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub outcomes: Vec<StepOutcome>,
    pub attributes: Vec<AttributeChange>,
    pub datacenters: Vec<DatacenterSnapshot>,
    pub fabric: Option<FabricSnapshot>,
}

pub fn load(path: &Path) -> anyhow::Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing scenario {}", path.display()))?;
    Ok(scenario)
}

struct World {
    datacenters: Vec<Arc<DatacenterCoordinator>>,
    fabric: Option<Arc<FabricCoordinator>>,
}

impl World {
    fn datacenter(&self, name: &str) -> seeding::Result<&Arc<DatacenterCoordinator>> {
        self.datacenters
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| SeedingError::UnknownDatacenter(name.to_string()))
    }

    fn fabric(&self) -> seeding::Result<&Arc<FabricCoordinator>> {
        self.fabric
            .as_ref()
            .ok_or_else(|| SeedingError::InvalidConfig("scenario has no fabric".into()))
    }
}

pub fn run(scenario: Scenario) -> seeding::Result<SimulationReport> {
    let (sink, rx) = ChannelSink::unbounded();
    let sink = Arc::new(sink);

    let datacenters = scenario
        .datacenters
        .into_iter()
        .map(|setup| DatacenterCoordinator::new(setup.name, setup.config, sink.clone()))
        .collect::<seeding::Result<Vec<_>>>()?;
    let fabric = match scenario.fabric {
        Some(setup) => Some(FabricCoordinator::new(
            setup.name,
            setup.config,
            datacenters.clone(),
            sink.clone(),
        )?),
        None => None,
    };
    let world = World {
        datacenters,
        fabric,
    };

    let mut outcomes = Vec::new();
    for (index, step) in scenario.steps.into_iter().enumerate() {
        info!(step = index, ?step, "replaying");
        match step {
            Step::Event { datacenter, event } => world.datacenter(&datacenter)?.handle(event),
            Step::ServiceState {
                datacenter: Some(datacenter),
                state,
            } => world.datacenter(&datacenter)?.set_service_state(state),
            Step::ServiceState {
                datacenter: None,
                state,
            } => world.fabric()?.set_service_state(state),
            Step::Grow { datacenter, delta } => {
                let assignments = world.datacenter(&datacenter)?.grow(delta)?;
                outcomes.push(StepOutcome::Grow {
                    datacenter,
                    assignments,
                });
            }
            Step::Replace { datacenter, node } => {
                let tokens = world.datacenter(&datacenter)?.replacement_tokens(node)?;
                outcomes.push(StepOutcome::Replace {
                    datacenter,
                    node,
                    tokens,
                });
            }
            Step::AssignTokens {
                datacenter,
                node,
                tokens,
            } => world.datacenter(&datacenter)?.assign_tokens(node, tokens)?,
            Step::Update {
                datacenter: Some(datacenter),
            } => world.datacenter(&datacenter)?.update(),
            Step::Update { datacenter: None } => world.fabric()?.update(),
        }
    }

    Ok(SimulationReport {
        outcomes,
        attributes: rx.try_iter().collect(),
        datacenters: world.datacenters.iter().map(|d| d.snapshot()).collect(),
        fabric: world.fabric.as_ref().map(|f| f.snapshot()),
    })
}
