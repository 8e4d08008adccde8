//! Query results

use serde::Serialize;
use serde_json::Value;

use super::errors::{QueryError, QueryResult};

/// Contents of a group: rows at the deepest expanded level, child groups
/// above it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GroupItems {
    Rows(Vec<Value>),
    Groups(Vec<GroupItem>),
}

/// One group of one level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupItem {
    pub key: Value,
    pub count: u64,
    /// Serialized as `null` when absent, never as an empty list
    pub items: Option<GroupItems>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Vec<Value>>,
}

impl GroupItem {
    /// Reads a group document produced by the grouping stages:
    /// `{key, count?, items?}`
    pub fn from_document(doc: &Value) -> QueryResult<Self> {
        let key = doc
            .get("key")
            .cloned()
            .ok_or_else(|| QueryError::InvalidResult(format!("group without key: {}", doc)))?;

        let count = match doc.get("count") {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_u64().ok_or_else(|| {
                QueryError::InvalidResult(format!("group count is not a count: {}", value))
            })?,
        };

        let items = match doc.get("items") {
            Some(Value::Array(rows)) => Some(GroupItems::Rows(rows.clone())),
            _ => None,
        };

        Ok(Self {
            key,
            count,
            items,
            summary: None,
        })
    }

    /// Rows of a deepest-level group
    pub fn rows(&self) -> Option<&[Value]> {
        match &self.items {
            Some(GroupItems::Rows(rows)) => Some(rows),
            _ => None,
        }
    }

    /// Child groups of a non-deepest group
    pub fn groups(&self) -> Option<&[GroupItem]> {
        match &self.items {
            Some(GroupItems::Groups(groups)) => Some(groups),
            _ => None,
        }
    }
}

/// Top-level data of a response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Rows(Vec<Value>),
    Groups(Vec<GroupItem>),
}

/// Result envelope of a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub data: ResponseData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Vec<Value>>,
}

impl QueryResponse {
    pub fn rows(data: Vec<Value>) -> Self {
        Self::new(ResponseData::Rows(data))
    }

    pub fn groups(data: Vec<GroupItem>) -> Self {
        Self::new(ResponseData::Groups(data))
    }

    fn new(data: ResponseData) -> Self {
        Self {
            data,
            total_count: None,
            group_count: None,
            summary: None,
        }
    }

    /// Rows of a flat response
    pub fn data_rows(&self) -> Option<&[Value]> {
        match &self.data {
            ResponseData::Rows(rows) => Some(rows),
            ResponseData::Groups(_) => None,
        }
    }

    /// Groups of a grouped response
    pub fn data_groups(&self) -> Option<&[GroupItem]> {
        match &self.data {
            ResponseData::Groups(groups) => Some(groups),
            ResponseData::Rows(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
