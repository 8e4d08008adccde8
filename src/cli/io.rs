//! JSON I/O handling for CLI
//!
//! Inputs are JSON files, or stdin when the path is `-`. Output is one
//! pretty-printed JSON document on stdout.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Path that stands for stdin
pub const STDIN_PATH: &str = "-";

/// Read a JSON document from a file or stdin
pub fn read_json(path: &Path) -> CliResult<Value> {
    let content = if path.as_os_str() == STDIN_PATH {
        let mut buf = String::new();
        io::stdin().lock().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path)
            .map_err(|e| CliError::io_error(format!("{}: {}", path.display(), e)))?
    };

    if content.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    let value: Value = serde_json::from_str(&content)?;
    Ok(value)
}

/// Write a JSON document to stdout
pub fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
