//! `$match` predicate evaluation

use std::cmp::Ordering;

use regex::RegexBuilder;
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use super::value::{compare_same_type, resolve_field, values_equal};

const NOT_CONTAINS_PREFIX: &str = "^((?!";
const NOT_CONTAINS_SUFFIX: &str = ").)*$";

/// Returns true when `doc` satisfies `predicate`
pub fn matches(doc: &Value, predicate: &Value) -> StoreResult<bool> {
    let clauses = predicate
        .as_object()
        .ok_or_else(|| StoreError::invalid_stage("$match", "predicate must be an object"))?;

    for (key, condition) in clauses {
        let satisfied = match key.as_str() {
            "$and" => all(doc, key, condition)?,
            "$or" => any(doc, key, condition)?,
            "$nor" => !any(doc, key, condition)?,
            op if op.starts_with('$') => {
                return Err(StoreError::UnsupportedOperator(op.to_string()))
            }
            field => field_matches(resolve_field(doc, field), condition)?,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_predicates<'p>(key: &str, condition: &'p Value) -> StoreResult<&'p Vec<Value>> {
    condition
        .as_array()
        .ok_or_else(|| StoreError::invalid_stage("$match", format!("{} requires an array", key)))
}

fn all(doc: &Value, key: &str, condition: &Value) -> StoreResult<bool> {
    for predicate in sub_predicates(key, condition)? {
        if !matches(doc, predicate)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any(doc: &Value, key: &str, condition: &Value) -> StoreResult<bool> {
    for predicate in sub_predicates(key, condition)? {
        if matches(doc, predicate)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn is_operator_object(condition: &Value) -> Option<&Map<String, Value>> {
    condition
        .as_object()
        .filter(|map| !map.is_empty() && map.keys().all(|k| k.starts_with('$')))
        .filter(|map| !map.contains_key("$date"))
}

fn field_matches(value: Option<&Value>, condition: &Value) -> StoreResult<bool> {
    let operators = match is_operator_object(condition) {
        Some(operators) => operators,
        None => return Ok(equals(value, condition)),
    };

    for (op, operand) in operators {
        let satisfied = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => ordered(value, operand, |o| o == Ordering::Greater),
            "$gte" => ordered(value, operand, |o| o != Ordering::Less),
            "$lt" => ordered(value, operand, |o| o == Ordering::Less),
            "$lte" => ordered(value, operand, |o| o != Ordering::Greater),
            "$regex" => {
                let options = operators.get("$options").and_then(Value::as_str).unwrap_or("");
                regex_matches(value, operand, options)?
            }
            "$options" => true,
            other => return Err(StoreError::UnsupportedOperator(other.to_string())),
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Missing fields equal null; arrays match when any element equals
fn equals(value: Option<&Value>, operand: &Value) -> bool {
    match value {
        None => operand.is_null(),
        Some(Value::Array(items)) if !operand.is_array() => {
            items.iter().any(|item| values_equal(item, operand))
        }
        Some(value) => values_equal(value, operand),
    }
}

/// Ordering comparisons never match across type classes
fn ordered(value: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    value
        .and_then(|value| compare_same_type(value, operand))
        .map_or(false, accept)
}

fn regex_matches(value: Option<&Value>, pattern: &Value, options: &str) -> StoreResult<bool> {
    let text = match value.and_then(Value::as_str) {
        Some(text) => text,
        None => return Ok(false),
    };
    let pattern = pattern
        .as_str()
        .ok_or_else(|| StoreError::invalid_stage("$match", "$regex requires a string"))?;

    // the regex crate has no lookahead; "contains no X" is evaluated as !contains
    if let Some(inner) = pattern
        .strip_prefix(NOT_CONTAINS_PREFIX)
        .and_then(|rest| rest.strip_suffix(NOT_CONTAINS_SUFFIX))
    {
        return Ok(!compile(inner, options)?.is_match(text));
    }
    Ok(compile(pattern, options)?.is_match(text))
}

fn compile(pattern: &str, options: &str) -> StoreResult<regex::Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .ignore_whitespace(options.contains('x'))
        .build()
        .map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}
