//! Subcommands and their JSON results.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use corelib::{PartitionerKind, Token, TokenGenerator};
use num_bigint::BigInt;
use seeding::quorum::{datacenter_quorum_size, fabric_quorum_size};
use serde::Serialize;

use crate::scenario::{self, SimulationReport};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan tokens for new nodes
    Tokens {
        /// Number of nodes to add
        #[arg(long, default_value = "1")]
        count: usize,

        /// murmur3 or random
        #[arg(long, default_value = "murmur3")]
        partitioner: PartitionerKind,

        /// Ring origin shift (random if omitted)
        #[arg(long, allow_hyphen_values = true)]
        shift: Option<BigInt>,

        /// Tokens already on the ring (comma-separated)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        existing: Vec<Token>,
    },

    /// Derive tokens for a node replacing one that failed
    Replace {
        #[arg(long, default_value = "murmur3")]
        partitioner: PartitionerKind,

        /// Tokens of the node being replaced
        #[arg(required = true, allow_hyphen_values = true)]
        tokens: Vec<Token>,
    },

    /// Show default seed quorums for datacenter initial sizes
    Quorum {
        /// Initial size of each datacenter
        #[arg(required = true)]
        sizes: Vec<usize>,

        /// Explicit datacenter quorum
        #[arg(long)]
        datacenter_quorum: Option<usize>,

        /// Explicit fabric quorum
        #[arg(long)]
        fabric_quorum: Option<usize>,
    },

    /// Replay a JSON scenario of membership events
    Simulate {
        /// Scenario file
        file: PathBuf,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    Tokens(Vec<Token>),
    Replacement(BTreeSet<Token>),
    Quorum {
        datacenters: Vec<usize>,
        fabric: usize,
    },
    Simulation(SimulationReport),
}

impl Command {
    pub fn execute(&self) -> anyhow::Result<CommandResult> {
        match self {
            Command::Tokens {
                count,
                partitioner,
                shift,
                existing,
            } => {
                let mut generator = TokenGenerator::from_shift(partitioner, shift.clone());
                if !existing.is_empty() {
                    generator
                        .refresh(existing.iter().cloned().collect())
                        .context("existing tokens")?;
                }
                generator.growing_cluster(*count)?;
                let tokens = std::iter::from_fn(|| generator.new_token()).collect();
                Ok(CommandResult::Tokens(tokens))
            }

            Command::Replace {
                partitioner,
                tokens,
            } => {
                let generator = TokenGenerator::new(partitioner, BigInt::from(0));
                let old: BTreeSet<Token> = tokens.iter().cloned().collect();
                Ok(CommandResult::Replacement(
                    generator.tokens_for_replacement_node(&old)?,
                ))
            }

            Command::Quorum {
                sizes,
                datacenter_quorum,
                fabric_quorum,
            } => Ok(CommandResult::Quorum {
                datacenters: sizes
                    .iter()
                    .map(|&size| datacenter_quorum_size(size, *datacenter_quorum))
                    .collect(),
                fabric: fabric_quorum_size(sizes.iter().copied(), *fabric_quorum),
            }),

            Command::Simulate { file } => {
                let scenario = scenario::load(file)?;
                Ok(CommandResult::Simulation(scenario::run(scenario)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::CliConfig;

    fn parse(args: &[&str]) -> Command {
        CliConfig::try_parse_from(std::iter::once("ringctl").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_tokens_command() {
        let command = parse(&["tokens", "--count", "2", "--shift", "0"]);
        match command.execute().unwrap() {
            CommandResult::Tokens(tokens) => {
                assert_eq!(tokens, vec![Token::from(i64::MIN), Token::from(0i64)]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_tokens_command_rejects_foreign_existing_token() {
        let command = parse(&[
            "tokens",
            "--partitioner",
            "murmur3",
            "--existing",
            "340282366920938463463374607431768211455",
        ]);
        assert!(command.execute().is_err());
    }

    #[test]
    fn test_replace_command_wraps() {
        let command = parse(&["replace", "--partitioner", "random", "0"]);
        match command.execute().unwrap() {
            CommandResult::Replacement(tokens) => {
                let max = (BigInt::from(1) << 127u32) - BigInt::from(1);
                assert_eq!(tokens, [Token::new(max)].into_iter().collect());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_quorum_command() {
        let command = parse(&["quorum", "3", "3"]);
        match command.execute().unwrap() {
            CommandResult::Quorum {
                datacenters,
                fabric,
            } => {
                assert_eq!(datacenters, vec![2, 2]);
                assert_eq!(fabric, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_partitioner_is_a_usage_error() {
        let args = ["ringctl", "tokens", "--partitioner", "ordered"];
        assert!(CliConfig::try_parse_from(args).is_err());
    }
}
