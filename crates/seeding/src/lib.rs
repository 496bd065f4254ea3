//! Quorum-gated seed election for datacenters and fabrics of datacenters.
//!
//! This crate provides:
//! - Seed viability rules and quorum sizing
//! - Pluggable seed selection strategies (single and multi-datacenter)
//! - `DatacenterCoordinator`: membership, token planning, local election
//! - `FabricCoordinator`: one seed set across many datacenters

pub mod config;
pub mod datacenter;
pub mod elector;
pub mod error;
pub mod event;
pub mod fabric;
pub mod membership;
pub mod publish;
pub mod quorum;
pub mod strategy;
pub mod usage;
pub mod viability;

pub use config::{DatacenterConfig, FabricConfig};
pub use datacenter::{DatacenterCoordinator, DatacenterSnapshot, Endpoint, TokenAssignment};
pub use elector::{ElectionInput, SeedChange, SeedElector};
pub use error::{Result, SeedingError};
pub use event::NodeEvent;
pub use fabric::{FabricCoordinator, FabricSnapshot};
pub use membership::{MemberChange, Membership};
pub use publish::{Attribute, AttributeChange, AttributeSink, ChannelSink, NullSink};
pub use strategy::{Candidates, NetworkTopologySeedStrategy, SeedStrategy, SimpleSeedStrategy};
pub use usage::DatacenterUsage;
