//! Partitioner abstraction for the token ring.
//!
//! Exactly two rings are supported. [`PartitionerKind`] is the closed selector
//! read from configuration; an unrecognised name is a configuration error.

pub mod murmur3;
pub mod random;
pub mod traits;

pub use murmur3::Murmur3Partitioner;
pub use random::RandomPartitioner;
pub use traits::Partitioner;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::token::Token;

/// Which ring a datacenter's tokens are drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PartitionerKind {
    /// Signed 64-bit ring.
    #[default]
    Murmur3,
    /// Legacy non-negative 127-bit ring.
    Random,
}

impl PartitionerKind {
    fn inner(&self) -> &'static dyn Partitioner {
        match self {
            PartitionerKind::Murmur3 => &Murmur3Partitioner,
            PartitionerKind::Random => &RandomPartitioner,
        }
    }
}

impl Partitioner for PartitionerKind {
    fn min_token(&self) -> Token {
        self.inner().min_token()
    }

    fn max_token(&self) -> Token {
        self.inner().max_token()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

impl FromStr for PartitionerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "murmur3" | "signed64" | "Murmur3Partitioner"
            | "org.apache.cassandra.dht.Murmur3Partitioner" => Ok(PartitionerKind::Murmur3),
            "random" | "legacy127" | "RandomPartitioner"
            | "org.apache.cassandra.dht.RandomPartitioner" => Ok(PartitionerKind::Random),
            other => Err(Error::UnknownPartitioner(other.to_string())),
        }
    }
}

impl fmt::Display for PartitionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PartitionerKind::Murmur3 => "murmur3",
            PartitionerKind::Random => "random",
        })
    }
}

impl Serialize for PartitionerKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartitionerKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
