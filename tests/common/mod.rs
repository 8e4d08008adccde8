//! Shared fixtures for integration tests

#![allow(dead_code)]

use serde_json::{json, Value};

use gridshape::query::{LoadOptions, QueryConfig, QueryEngine};
use gridshape::store::{MemoryStore, RecordingRunner};

pub type Engine = QueryEngine<RecordingRunner<MemoryStore>>;

/// Ten orders, five in category A and five in B. Three amounts exceed 100.
pub fn orders() -> Vec<Value> {
    let amounts = [5, 50, 100, 101, 250, 99, 7, 300, 42, 0];
    let months = ["01", "02", "03", "04", "05", "06", "07", "08", "09", "10"];
    amounts
        .iter()
        .zip(months.iter())
        .enumerate()
        .map(|(i, (amount, month))| {
            let kind = if i % 2 == 0 { "Widget" } else { "Gadget" };
            let category = if i < 5 { "A" } else { "B" };
            json!({
                "_id": {"$oid": format!("65a1f0c2e4b0a1b2c3d4e5{:02x}", i)},
                "name": format!("{} {}", kind, i),
                "category": category,
                "amount": amount,
                "orderDate": {"$date": format!("2024-{}-15T12:00:00.000Z", month)}
            })
        })
        .collect()
}

pub fn engine() -> Engine {
    engine_with(QueryConfig::default())
}

pub fn engine_with(config: QueryConfig) -> Engine {
    QueryEngine::with_config(RecordingRunner::new(MemoryStore::new(orders())), config)
}

pub fn options(value: Value) -> LoadOptions {
    LoadOptions::from_value(value).unwrap()
}

/// True when some stage of `pipeline` is `{name: ...}`
pub fn has_stage(pipeline: &[Value], name: &str) -> bool {
    pipeline.iter().any(|stage| stage.get(name).is_some())
}
