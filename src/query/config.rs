//! Query configuration
//!
//! Loaded from a JSON file or defaulted. Every field is optional:
//!
//! ```json
//! {
//!   "normalize_identifiers": true,
//!   "summary_query_limit": 100,
//!   "timezone_offset": 0,
//!   "materialize_collapsed_groups": true,
//!   "log_level": "info"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};
use crate::observability::{log_event, Event, Logger, Severity};

/// Largest accepted timezone offset, in minutes
const MAX_TIMEZONE_OFFSET: i64 = 24 * 60;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Turn `{"$oid": ...}` identifiers into plain strings (default: true)
    #[serde(default = "default_true")]
    pub normalize_identifiers: bool,

    /// Group summary queries allowed per request; 0 disables the limit
    /// (default: 100)
    #[serde(default = "default_summary_query_limit")]
    pub summary_query_limit: u32,

    /// Minutes subtracted from dates before extracting calendar parts
    /// (default: 0)
    #[serde(default)]
    pub timezone_offset: i64,

    /// Query sub-groups of collapsed groups too; when false, collapsed
    /// groups are counted with a separate query instead (default: true)
    #[serde(default = "default_true")]
    pub materialize_collapsed_groups: bool,

    /// Minimum log severity: trace, info, warn or error (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}
fn default_summary_query_limit() -> u32 {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            normalize_identifiers: true,
            summary_query_limit: default_summary_query_limit(),
            timezone_offset: 0,
            materialize_collapsed_groups: true,
            log_level: default_log_level(),
        }
    }
}

impl QueryConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> QueryResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("Failed to read config: {}", e)))?;

        let config: QueryConfig = serde_json::from_str(&content)
            .map_err(|e| QueryError::Config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        log_event(
            Event::ConfigLoaded,
            &[
                ("path", &path.display().to_string()),
                ("summary_query_limit", &config.summary_query_limit.to_string()),
            ],
        );
        Ok(config)
    }

    /// Validate field ranges
    pub fn validate(&self) -> QueryResult<()> {
        if Severity::parse(&self.log_level).is_none() {
            return Err(QueryError::Config(format!(
                "Invalid log_level: '{}'. Must be trace, info, warn or error.",
                self.log_level
            )));
        }

        if self.timezone_offset.abs() > MAX_TIMEZONE_OFFSET {
            return Err(QueryError::Config(format!(
                "timezone_offset must be within +/-{} minutes, got {}",
                MAX_TIMEZONE_OFFSET, self.timezone_offset
            )));
        }

        Ok(())
    }

    /// Summary query ceiling, `None` when unlimited
    pub fn summary_limit(&self) -> Option<u32> {
        match self.summary_query_limit {
            0 => None,
            limit => Some(limit),
        }
    }

    /// Configured log severity
    pub fn severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }

    /// Apply the log severity process-wide
    pub fn apply_logging(&self) {
        Logger::set_min_severity(self.severity());
    }
}
