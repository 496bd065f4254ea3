//! Core partitioner trait definitions.

use crate::token::{Token, TokenSpace};

/// A partitioner fixes the ring tokens are drawn from.
///
/// Only the ring bounds matter here: the key-hashing side of a partitioner
/// belongs to the storage process itself.
pub trait Partitioner: Send + Sync + 'static {
    /// Returns the minimum token value for this partitioner.
    fn min_token(&self) -> Token;

    /// Returns the maximum token value for this partitioner.
    fn max_token(&self) -> Token;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;

    /// The ring `[min_token, max_token]`.
    fn space(&self) -> TokenSpace {
        TokenSpace::from_ordered(self.min_token().into_inner(), self.max_token().into_inner())
    }
}
