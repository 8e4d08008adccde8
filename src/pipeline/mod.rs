//! Aggregation stage builders
//!
//! Every function here is pure: it takes request fragments and returns the
//! stage documents a MongoDB-style aggregation engine executes. Stage
//! documents keep key insertion order, so `{"_id": 0, "key": "$_id"}` is
//! emitted exactly as written.

mod interval;
mod stages;
mod summary;

pub use interval::{date_part_stages, DateInterval, GroupInterval, QUARTER_SCRATCH_FIELD};
pub use stages::{
    compiled_filter_stages, count_stages, filter_stages, group_key_field, group_key_stages,
    group_narrowing_stages, group_stage, grouping_stages, match_stages, search_expression,
    search_stages, select_projection, select_stages, skip_take_stages, sort_stages,
    strip_group_key_fields, GroupKeyStages, CURRENT_DOCUMENT,
};
pub use summary::{accumulator_name, summary_stages, summary_values};

use serde_json::{Map, Value};

/// A one-key document `{key: value}`
pub(crate) fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}
