//! CLI argument definitions using clap
//!
//! Commands:
//! - gridshape explain --options <path> [--data <path>] [--config <path>]
//! - gridshape run --options <path> --data <path> [--config <path>]
//!
//! A path of `-` reads from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gridshape - compiles grid load options into aggregation pipelines
#[derive(Parser, Debug)]
#[command(name = "gridshape")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the pipelines a request issues
    Explain {
        /// Load options JSON file
        #[arg(long, default_value = "-")]
        options: PathBuf,

        /// JSON array of documents; without it pipelines run against no data
        #[arg(long)]
        data: Option<PathBuf>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a request against a JSON document set and print the response
    Run {
        /// Load options JSON file
        #[arg(long, default_value = "-")]
        options: PathBuf,

        /// JSON array of documents
        #[arg(long)]
        data: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
