//! CLI interface for the bargaining client.

mod commands;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;
pub use utils::*;

#[derive(Parser)]
#[command(name = "bargain-client")]
#[command(about = "Plays a multi-round bargaining game against a remote server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file path (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the game server and play until it sends COMPLETE
    Run {
        /// Strategy selector (overrides AGENT_STRATEGY)
        #[arg(long, short = 's')]
        strategy: Option<String>,

        #[arg(long, short = 'u')]
        server_url: Option<String>,

        #[arg(long, short = 'p')]
        server_port: Option<u16>,

        /// Delay between connecting and sending HELLO, in milliseconds
        #[arg(long)]
        settle_delay_ms: Option<u64>,

        /// Answer PING with PONG
        #[arg(long)]
        reply_to_ping: bool,

        /// Number of independent sessions to play concurrently
        #[arg(long, short = 'n', default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=256))]
        sessions: u32,
    },

    /// Check a strategy offline against the decision contract
    Check {
        selector: String,
    },

    /// List registered strategies
    Strategies,

    /// Show the resolved configuration
    Config {
        #[arg(long)]
        show: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let config_path = self.config;
        let mut settings = load_settings(config_path.as_deref(), self.log_level)?;

        match self.command {
            Commands::Run {
                strategy,
                server_url,
                server_port,
                settle_delay_ms,
                reply_to_ping,
                sessions,
            } => {
                apply_run_overrides(
                    &mut settings,
                    RunOverrides {
                        strategy,
                        server_url,
                        server_port,
                        settle_delay_ms,
                        reply_to_ping,
                    },
                );
                start_logging(&settings, config_path.as_deref())?;
                run(settings, sessions as usize).await
            }
            Commands::Check { selector } => {
                start_logging(&settings, config_path.as_deref())?;
                check(&selector)
            }
            Commands::Strategies => strategies(),
            Commands::Config { show } => config(&settings, show),
        }
    }
}
