//! Identifier normalization
//!
//! Stores hand back identifiers in their native shape. Grid clients want
//! plain strings, so row documents pass through an [`IdentifierNormalizer`]
//! before they reach the response.

use serde_json::Value;

/// Rewrites the identifier of a row document for client display
pub trait IdentifierNormalizer: Send + Sync {
    fn normalize(&self, doc: Value) -> Value;
}

/// Turns extended-JSON object ids, `{"_id": {"$oid": "<hex>"}}`, into
/// `{"_id": "<hex>"}`. Other documents pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectIdNormalizer;

impl IdentifierNormalizer for ObjectIdNormalizer {
    fn normalize(&self, mut doc: Value) -> Value {
        if let Some(id) = doc.get_mut("_id") {
            let hex = id
                .as_object()
                .filter(|object| object.len() == 1)
                .and_then(|object| object.get("$oid"))
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(hex) = hex {
                *id = Value::String(hex);
            }
        }
        doc
    }
}

/// Leaves every document unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepIdentifiers;

impl IdentifierNormalizer for KeepIdentifiers {
    fn normalize(&self, doc: Value) -> Value {
        doc
    }
}
