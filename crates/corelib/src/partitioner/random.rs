//! Random partitioner ring (legacy Cassandra layout).

use crate::partitioner::traits::Partitioner;
use crate::token::Token;

/// Non-negative 127-bit ring `[0, 2^127 - 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomPartitioner;

impl Partitioner for RandomPartitioner {
    fn min_token(&self) -> Token {
        Token::from(0u64)
    }

    fn max_token(&self) -> Token {
        Token::from(u128::MAX >> 1)
    }

    fn name(&self) -> &'static str {
        "RandomPartitioner"
    }
}
