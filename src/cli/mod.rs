//! CLI module for gridshape
//!
//! Provides command-line interface for:
//! - explain: print the pipelines a request issues
//! - run: run a request against a JSON document set

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{execute, explain, load_config, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_json, write_json};
