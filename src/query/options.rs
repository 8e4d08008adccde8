//! Load options
//!
//! The request a data-grid client sends to shape a collection. Every field
//! is optional on the wire; `null` is treated the same as absent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use crate::pipeline::GroupInterval;

/// One sort criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortInfo {
    pub selector: String,
    #[serde(default, deserialize_with = "nullable")]
    pub desc: bool,
}

/// One group level, outermost first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub selector: String,
    #[serde(default, deserialize_with = "nullable")]
    pub desc: bool,
    /// Whether the client shows the contents of this level's groups
    #[serde(default, deserialize_with = "nullable")]
    pub is_expanded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_interval: Option<GroupInterval>,
}

/// Reduction applied by a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    /// Anything else; carried through and ignored
    #[serde(other)]
    Other,
}

/// One requested summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryInfo {
    /// Unused for `count`
    #[serde(default, deserialize_with = "nullable")]
    pub selector: String,
    pub summary_type: SummaryType,
}

/// Fields searched by a free-text search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchExpr {
    Single(String),
    Many(Vec<String>),
}

/// A complete shaping request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadOptions {
    /// Filter expression, see [`crate::filter`]
    pub filter: Option<Value>,
    pub search_expr: Option<SearchExpr>,
    pub search_operation: Option<String>,
    pub search_value: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub sort: Vec<SortInfo>,
    #[serde(deserialize_with = "nullable")]
    pub group: Vec<GroupInfo>,
    #[serde(deserialize_with = "nullable")]
    pub group_summary: Vec<SummaryInfo>,
    #[serde(deserialize_with = "nullable")]
    pub total_summary: Vec<SummaryInfo>,
    #[serde(deserialize_with = "nullable")]
    pub select: Vec<String>,
    /// 0 means no skip
    #[serde(deserialize_with = "nullable")]
    pub skip: u64,
    /// 0 means no limit
    #[serde(deserialize_with = "nullable")]
    pub take: u64,
    #[serde(deserialize_with = "nullable")]
    pub require_group_count: bool,
    #[serde(deserialize_with = "nullable")]
    pub require_total_count: bool,
}

impl LoadOptions {
    /// Parses load options from JSON text
    pub fn from_json(text: &str) -> QueryResult<Self> {
        serde_json::from_str(text).map_err(|e| QueryError::InvalidOptions(e.to_string()))
    }

    /// Parses load options from a JSON value
    pub fn from_value(value: Value) -> QueryResult<Self> {
        serde_json::from_value(value).map_err(|e| QueryError::InvalidOptions(e.to_string()))
    }

    /// True when the request groups its result
    pub fn is_grouped(&self) -> bool {
        !self.group.is_empty()
    }

    /// True when totals (count or summary) must be computed
    pub fn totals_required(&self) -> bool {
        self.require_total_count || !self.total_summary.is_empty()
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
