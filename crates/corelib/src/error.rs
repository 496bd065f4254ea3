//! Error types for the core library.

use thiserror::Error;

use crate::node::NodeId;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// Everything here is either a configuration mistake or a broken caller
/// contract. Degraded topology (no seeds yet, nodes down) is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Token value could not be parsed or is otherwise unusable.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token lies outside the ring it was handed to.
    #[error("Token {token} outside ring [{min}, {max}]")]
    TokenOutOfRange {
        token: String,
        min: String,
        max: String,
    },

    /// No gap on the ring is wide enough to place another token.
    #[error("Ring exhausted: no gap wide enough to place a new token")]
    RingExhausted,

    /// Configured partitioner does not name one of the supported rings.
    #[error("Unknown partitioner: {0}")]
    UnknownPartitioner(String),

    /// Configuration rejected at construction time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation referenced a node that is not a member.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
}
