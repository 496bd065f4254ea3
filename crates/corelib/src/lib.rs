//! Core library for token-ring planning.
//!
//! This crate provides the fundamental abstractions shared by the seeding
//! layer:
//! - Token values and the modular space they live in
//! - The two supported partitioner rings
//! - The token generator (equidistant bootstrap, widest-gap growth,
//!   replacement tokens)
//! - Node health snapshots and lifecycle states

pub mod error;
pub mod lifecycle;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod token;

pub use error::{Error, Result};
pub use lifecycle::Lifecycle;
pub use node::{Node, NodeId};
pub use partitioner::{Partitioner, PartitionerKind};
pub use ring::TokenGenerator;
pub use token::{Token, TokenSpace};
