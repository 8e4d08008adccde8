//! CLI command implementations
//!
//! Both commands load the configuration, parse the load options and run
//! the request on a current-thread tokio runtime against an in-memory
//! document set.

use std::path::Path;

use serde_json::{json, Value};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_json, write_json};
use crate::query::{LoadOptions, QueryConfig, QueryEngine};
use crate::store::{MemoryStore, RecordingRunner};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Explain {
            options,
            data,
            config,
        } => {
            let output = explain(&options, data.as_deref(), config.as_deref())?;
            write_json(&output)
        }
        Command::Run {
            options,
            data,
            config,
        } => {
            let output = execute(&options, &data, config.as_deref())?;
            write_json(&output)
        }
    }
}

/// Run a request and return its response document
pub fn execute(options_path: &Path, data_path: &Path, config_path: Option<&Path>) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let options = load_options(options_path)?;
    let store = MemoryStore::from_file(data_path)?;

    let engine = QueryEngine::with_config(store, config);
    let response = block_on(engine.query(&options))??;
    Ok(response.to_json())
}

/// Run a request and return the pipelines it issued, plus the response
///
/// Without a data file every pipeline runs against an empty collection,
/// which still shows the stages a request compiles to.
pub fn explain(
    options_path: &Path,
    data_path: Option<&Path>,
    config_path: Option<&Path>,
) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let options = load_options(options_path)?;
    let store = match data_path {
        Some(path) => MemoryStore::from_file(path)?,
        None => MemoryStore::default(),
    };

    let engine = QueryEngine::with_config(RecordingRunner::new(store), config);
    let response = block_on(engine.query(&options))??;

    Ok(json!({
        "pipelines": engine.runner().pipelines(),
        "response": response.to_json(),
    }))
}

/// Configuration from `path`, or defaults; applies the log level
pub fn load_config(path: Option<&Path>) -> CliResult<QueryConfig> {
    let config = match path {
        Some(path) => QueryConfig::load(path)?,
        None => QueryConfig::default(),
    };
    config.apply_logging();
    Ok(config)
}

fn load_options(path: &Path) -> CliResult<LoadOptions> {
    let value = read_json(path)?;
    Ok(LoadOptions::from_value(value)?)
}

fn block_on<F: std::future::Future>(future: F) -> CliResult<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::io_error(format!("Failed to create tokio runtime: {}", e)))?;
    Ok(rt.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(value: Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", value).unwrap();
        file
    }

    fn documents() -> Value {
        json!([
            {"_id": 1, "category": "A", "amount": 50},
            {"_id": 2, "category": "A", "amount": 150},
            {"_id": 3, "category": "B", "amount": 250}
        ])
    }

    #[test]
    fn test_execute_flat() {
        let options = json_file(json!({
            "filter": ["amount", ">", 100],
            "requireTotalCount": true
        }));
        let data = json_file(documents());

        let output = execute(options.path(), data.path(), None).unwrap();
        assert_eq!(output["totalCount"], json!(2));
        assert_eq!(output["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_explain_without_data() {
        let options = json_file(json!({"sort": [{"selector": "amount", "desc": true}], "take": 2}));

        let output = explain(options.path(), None, None).unwrap();
        assert_eq!(
            output["pipelines"],
            json!([[{"$sort": {"amount": -1}}, {"$limit": 2}]])
        );
        assert_eq!(output["response"]["data"], json!([]));
    }

    #[test]
    fn test_bad_options() {
        let options = json_file(json!({"skip": "many"}));
        let data = json_file(documents());

        let err = execute(options.path(), data.path(), None).unwrap_err();
        assert_eq!(err.code_str(), "GRID_CLI_OPTIONS_ERROR");
    }

    #[test]
    fn test_bad_data() {
        let options = json_file(json!({}));
        let data = json_file(json!({"not": "an array"}));

        let err = execute(options.path(), data.path(), None).unwrap_err();
        assert_eq!(err.code_str(), "GRID_CLI_DATA_ERROR");
    }
}
