//! CLI argument definitions using clap
//!
//! Commands:
//! - varquery explain --schema <path> --request <path|-> [--dialect <name>] [--config <path>]
//! - varquery check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::planner::DialectKind;

/// varquery - partition-parallel variant queries over SQL backends
#[derive(Parser, Debug)]
#[command(name = "varquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the per-partition queries a request would run
    Explain {
        /// Table layout (JSON)
        #[arg(long)]
        schema: PathBuf,

        /// Query request (JSON); `-` reads stdin
        #[arg(long, default_value = "-")]
        request: PathBuf,

        /// Overrides the dialect from the config file
        #[arg(long, value_enum)]
        dialect: Option<DialectKind>,

        /// Engine config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Human-readable output instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// Validate an engine config file and print the effective settings
    CheckConfig {
        #[arg(long, default_value = "./varquery.json")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
