//! Document values
//!
//! Documents are plain JSON. Dates use the extended-JSON form
//! `{"$date": "2024-03-01T12:00:00.000Z"}` or `{"$date": <millis>}`.
//! Comparison follows the store's cross-type ordering:
//! null < numbers < strings < objects < arrays < booleans < dates.

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Map, Value};

/// Resolves a dotted path; `None` when any segment is missing
pub fn resolve_field<'v>(doc: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = doc;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Sets a dotted path, creating intermediate objects
pub fn set_field(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        let map = match current {
            Value::Object(map) => map,
            _ => return,
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), value);
            return;
        }
        let entry = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry;
    }
}

/// Reads an extended-JSON date
pub fn as_date(value: &Value) -> Option<DateTime<Utc>> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    match object.get("$date")? {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(millis) => Utc.timestamp_millis_opt(millis.as_i64()?).single(),
        _ => None,
    }
}

/// Writes an extended-JSON date
pub fn date_value(date: DateTime<Utc>) -> Value {
    json!({ "$date": date.to_rfc3339_opts(SecondsFormat::Millis, true) })
}

/// Integral results stay integers, everything else becomes a float
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn type_rank(value: &Value) -> u8 {
    if as_date(value).is_some() {
        return 6;
    }
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Compares two values of the same type class; `None` across classes
pub fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    if type_rank(a) != type_rank(b) {
        return None;
    }
    Some(compare(a, b))
}

/// Total order used by `$sort`, `$min` and `$max`
pub fn compare(a: &Value, b: &Value) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    if rank_a == 6 {
        return as_date(a).cmp(&as_date(b));
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y) {
                let ordering = compare(left, right);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((key_x, val_x), (key_y, val_y)) in x.iter().zip(y) {
                let ordering = key_x.cmp(key_y).then_with(|| compare(val_x, val_y));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}

/// Equality with numeric and date normalization (`1 == 1.0`)
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_same_type(a, b) == Some(Ordering::Equal)
}

/// Canonical text of a value, used as a grouping key
pub fn group_key(value: &Value) -> String {
    if let Some(date) = as_date(value) {
        return format!("date:{}", date.timestamp_millis());
    }
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) => number_value(f).to_string(),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_and_set() {
        let mut doc = json!({"a": {"b": 1}});
        assert_eq!(resolve_field(&doc, "a.b"), Some(&json!(1)));
        assert_eq!(resolve_field(&doc, "a.c"), None);

        set_field(&mut doc, "a.c.d", json!(2));
        assert_eq!(doc, json!({"a": {"b": 1, "c": {"d": 2}}}));
    }

    #[test]
    fn test_dates() {
        let text = json!({"$date": "2024-03-01T12:00:00.000Z"});
        let millis = json!({"$date": 1709294400000i64});
        assert_eq!(as_date(&text), as_date(&millis));
        assert!(as_date(&json!({"$date": "yesterday"})).is_none());
        assert_eq!(date_value(as_date(&millis).unwrap()), text);
    }

    #[test]
    fn test_cross_type_order() {
        assert_eq!(compare(&json!(null), &json!(1)), Ordering::Less);
        assert_eq!(compare(&json!(100), &json!("1")), Ordering::Less);
        assert_eq!(compare(&json!(true), &json!({"$date": 0})), Ordering::Less);
        assert_eq!(compare_same_type(&json!(1), &json!("1")), None);
    }

    #[test]
    fn test_numeric_equality() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert_eq!(group_key(&json!(20.0)), group_key(&json!(20)));
    }
}
