//! Command-line arguments and logging setup.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Command;

#[derive(Debug, Parser)]
#[command(name = "ringctl")]
#[command(about = "Plan token rings and replay seed elections")]
#[command(version)]
pub struct CliConfig {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn init_logging(&self) {
        // logs go to stderr; stdout carries the JSON result
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| self.log_level.as_str().into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    pub fn run(self) -> anyhow::Result<()> {
        self.init_logging();
        let result = self.command.execute()?;
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&result)?
        } else {
            serde_json::to_string(&result)?
        };
        println!("{}", rendered);
        Ok(())
    }
}
