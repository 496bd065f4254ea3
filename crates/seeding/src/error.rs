//! Errors for the seeding layer.
//!
//! Only misconfiguration and broken caller contracts surface here; waiting
//! for quorum or losing running seeds is normal operation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SeedingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedingError {
    #[error(transparent)]
    Core(#[from] corelib::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown datacenter: {0}")]
    UnknownDatacenter(String),

    #[error("Duplicate datacenter: {0}")]
    DuplicateDatacenter(String),
}
