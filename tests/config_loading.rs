//! Configuration files

use std::io::Write;

use gridshape::query::{QueryConfig, QueryError};
use tempfile::NamedTempFile;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = config_file(r#"{"summary_query_limit": 5, "timezone_offset": -120}"#);
    let config = QueryConfig::load(file.path()).unwrap();

    assert_eq!(config.summary_limit(), Some(5));
    assert_eq!(config.timezone_offset, -120);
    assert!(config.normalize_identifiers);
    assert!(config.materialize_collapsed_groups);
    assert_eq!(config.log_level, "info");
}

#[test]
fn test_zero_limit_is_unlimited() {
    let file = config_file(r#"{"summary_query_limit": 0}"#);
    assert_eq!(QueryConfig::load(file.path()).unwrap().summary_limit(), None);
}

#[test]
fn test_invalid_files() {
    let file = config_file(r#"{"log_level": "verbose"}"#);
    let err = QueryConfig::load(file.path()).unwrap_err();
    assert_eq!(err.code(), "GRID_CONFIG_ERROR");

    let file = config_file(r#"{"timezone_offset": 5000}"#);
    assert!(matches!(QueryConfig::load(file.path()), Err(QueryError::Config(_))));

    let file = config_file("not json");
    assert!(QueryConfig::load(file.path()).is_err());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = QueryConfig::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, QueryError::Config(_)));
}
