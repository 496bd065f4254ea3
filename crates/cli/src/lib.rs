//! `ringctl`: token planning and seed election from the command line.
//!
//! Provides commands for:
//! - Planning tokens for new nodes on either ring
//! - Deriving replacement tokens
//! - Showing default seed quorums
//! - Replaying membership scenarios against real coordinators

pub mod commands;
pub mod config;
pub mod scenario;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
