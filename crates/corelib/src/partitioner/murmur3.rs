//! Murmur3 partitioner ring (Cassandra-compatible).

use crate::partitioner::traits::Partitioner;
use crate::token::Token;

/// Signed 64-bit ring `[-2^63, 2^63 - 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Murmur3Partitioner;

impl Partitioner for Murmur3Partitioner {
    fn min_token(&self) -> Token {
        Token::from(i64::MIN)
    }

    fn max_token(&self) -> Token {
        Token::from(i64::MAX)
    }

    fn name(&self) -> &'static str {
        "Murmur3Partitioner"
    }
}
