//! Configuration read once when a coordinator is constructed.

use corelib::PartitionerKind;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SeedingError};

/// Settings for one datacenter of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatacenterConfig {
    /// Number of nodes the datacenter is first deployed with.
    #[serde(default = "default_initial_size")]
    pub initial_size: usize,

    /// Explicit seed quorum; ignored unless `> 0`.
    #[serde(default)]
    pub initial_quorum_size: Option<usize>,

    /// Ring the datacenter's tokens are drawn from.
    #[serde(default)]
    pub partitioner: PartitionerKind,

    /// Ring origin shift; one is drawn at random when absent.
    #[serde(default, with = "corelib::token::decimal::option")]
    pub token_shift: Option<BigInt>,

    /// Let each node pick `num_tokens_per_node` positions itself.
    #[serde(default)]
    pub use_vnodes: bool,

    #[serde(default = "default_num_tokens_per_node")]
    pub num_tokens_per_node: usize,
}

fn default_initial_size() -> usize {
    1
}

fn default_num_tokens_per_node() -> usize {
    1
}

impl Default for DatacenterConfig {
    fn default() -> Self {
        Self {
            initial_size: default_initial_size(),
            initial_quorum_size: None,
            partitioner: PartitionerKind::default(),
            token_shift: None,
            use_vnodes: false,
            num_tokens_per_node: default_num_tokens_per_node(),
        }
    }
}

impl DatacenterConfig {
    pub fn with_initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size;
        self
    }

    pub fn with_quorum_size(mut self, quorum_size: usize) -> Self {
        self.initial_quorum_size = Some(quorum_size);
        self
    }

    pub fn with_partitioner(mut self, partitioner: PartitionerKind) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn with_token_shift(mut self, shift: impl Into<BigInt>) -> Self {
        self.token_shift = Some(shift.into());
        self
    }

    pub fn with_vnodes(mut self, num_tokens_per_node: usize) -> Self {
        self.use_vnodes = true;
        self.num_tokens_per_node = num_tokens_per_node;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_tokens_per_node == 0 {
            return Err(SeedingError::InvalidConfig(
                "num_tokens_per_node must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for a fabric of datacenters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricConfig {
    /// Explicit fabric seed quorum; ignored unless `> 0`.
    #[serde(default)]
    pub initial_quorum_size: Option<usize>,
}
