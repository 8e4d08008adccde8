//! Aggregation expressions
//!
//! Covers the expression vocabulary the stage builders emit: field paths,
//! `$$CURRENT`, arithmetic (`$add`, `$subtract`, `$mod`, `$divide`) and the
//! calendar operators (`$year` ... `$second`).

use chrono::{Datelike, Duration, Timelike};
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use super::value::{as_date, date_value, number_value, resolve_field};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOperator {
    Year,
    Month,
    DayOfMonth,
    DayOfWeek,
    Hour,
    Minute,
    Second,
}

impl DateOperator {
    fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "$year" => DateOperator::Year,
            "$month" => DateOperator::Month,
            "$dayOfMonth" => DateOperator::DayOfMonth,
            "$dayOfWeek" => DateOperator::DayOfWeek,
            "$hour" => DateOperator::Hour,
            "$minute" => DateOperator::Minute,
            "$second" => DateOperator::Second,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    FieldRef(String),
    Current,
    Object(Vec<(String, Expression)>),
    Array(Vec<Expression>),
    Add(Vec<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Mod(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    DatePart(DateOperator, Box<Expression>),
}

impl Expression {
    pub fn parse(value: &Value) -> StoreResult<Self> {
        match value {
            Value::String(s) if s == "$$CURRENT" || s == "$$ROOT" => Ok(Expression::Current),
            Value::String(s) if s.starts_with("$$") => {
                Err(StoreError::UnsupportedOperator(s.clone()))
            }
            Value::String(s) if s.starts_with('$') => Ok(Expression::FieldRef(s[1..].to_string())),
            Value::Array(items) => Ok(Expression::Array(
                items.iter().map(Expression::parse).collect::<StoreResult<_>>()?,
            )),
            Value::Object(map) => Self::parse_object(map),
            other => Ok(Expression::Literal(other.clone())),
        }
    }

    fn parse_object(map: &Map<String, Value>) -> StoreResult<Self> {
        if map.len() == 1 {
            if let Some((op, arg)) = map.iter().next() {
                if op.starts_with('$') {
                    return Self::parse_operator(op, arg, map);
                }
            }
        }
        if let Some(op) = map.keys().find(|k| k.starts_with('$')) {
            return Err(StoreError::UnsupportedOperator(op.clone()));
        }
        let fields = map
            .iter()
            .map(|(k, v)| Ok((k.clone(), Expression::parse(v)?)))
            .collect::<StoreResult<_>>()?;
        Ok(Expression::Object(fields))
    }

    fn parse_operator(op: &str, arg: &Value, map: &Map<String, Value>) -> StoreResult<Self> {
        match op {
            "$date" => Ok(Expression::Literal(Value::Object(map.clone()))),
            "$literal" => Ok(Expression::Literal(arg.clone())),
            "$add" => Ok(Expression::Add(
                operands(op, arg)?.iter().map(Expression::parse).collect::<StoreResult<_>>()?,
            )),
            "$subtract" => {
                let (a, b) = binary(op, arg)?;
                Ok(Expression::Subtract(a, b))
            }
            "$mod" => {
                let (a, b) = binary(op, arg)?;
                Ok(Expression::Mod(a, b))
            }
            "$divide" => {
                let (a, b) = binary(op, arg)?;
                Ok(Expression::Divide(a, b))
            }
            _ => match DateOperator::parse(op) {
                Some(part) => {
                    let inner = match arg {
                        Value::Array(items) if items.len() == 1 => &items[0],
                        other => other,
                    };
                    Ok(Expression::DatePart(part, Box::new(Expression::parse(inner)?)))
                }
                None => Err(StoreError::UnsupportedOperator(op.to_string())),
            },
        }
    }

    /// Evaluates against `doc`; `None` when a field path is missing
    pub fn eval_opt(&self, doc: &Value) -> Option<Value> {
        match self {
            Expression::FieldRef(path) => resolve_field(doc, path).cloned(),
            other => Some(other.eval(doc)),
        }
    }

    /// Evaluates against `doc`; missing fields and type mismatches give null
    pub fn eval(&self, doc: &Value) -> Value {
        match self {
            Expression::Literal(v) => v.clone(),
            Expression::FieldRef(path) => resolve_field(doc, path).cloned().unwrap_or(Value::Null),
            Expression::Current => doc.clone(),
            Expression::Object(fields) => {
                let mut map = Map::new();
                for (name, expr) in fields {
                    if let Some(value) = expr.eval_opt(doc) {
                        map.insert(name.clone(), value);
                    }
                }
                Value::Object(map)
            }
            Expression::Array(items) => Value::Array(items.iter().map(|e| e.eval(doc)).collect()),
            Expression::Add(exprs) => add(exprs.iter().map(|e| e.eval(doc)).collect()),
            Expression::Subtract(a, b) => subtract(&a.eval(doc), &b.eval(doc)),
            Expression::Mod(a, b) => match (a.eval(doc).as_f64(), b.eval(doc).as_f64()) {
                (Some(a), Some(b)) if b != 0.0 => number_value(a % b),
                _ => Value::Null,
            },
            Expression::Divide(a, b) => match (a.eval(doc).as_f64(), b.eval(doc).as_f64()) {
                (Some(a), Some(b)) if b != 0.0 => number_value(a / b),
                _ => Value::Null,
            },
            Expression::DatePart(part, inner) => date_part(*part, &inner.eval(doc)),
        }
    }
}

fn operands<'v>(op: &str, arg: &'v Value) -> StoreResult<&'v Vec<Value>> {
    arg.as_array()
        .ok_or_else(|| StoreError::invalid_stage(op, "requires an array"))
}

fn binary(op: &str, arg: &Value) -> StoreResult<(Box<Expression>, Box<Expression>)> {
    let items = operands(op, arg)?;
    if items.len() != 2 {
        return Err(StoreError::invalid_stage(op, "requires exactly 2 arguments"));
    }
    Ok((
        Box::new(Expression::parse(&items[0])?),
        Box::new(Expression::parse(&items[1])?),
    ))
}

/// Numbers add up; a single date operand is shifted by the others (millis)
fn add(values: Vec<Value>) -> Value {
    let mut date = None;
    let mut sum = 0.0_f64;
    for value in &values {
        if let Some(d) = as_date(value) {
            if date.is_some() {
                return Value::Null;
            }
            date = Some(d);
        } else if let Some(n) = value.as_f64() {
            sum += n;
        } else {
            return Value::Null;
        }
    }
    match date {
        Some(d) => date_value(d + Duration::milliseconds(sum as i64)),
        None => number_value(sum),
    }
}

/// number - number, date - millis = date, date - date = millis
fn subtract(a: &Value, b: &Value) -> Value {
    match (as_date(a), as_date(b)) {
        (Some(x), Some(y)) => Value::from((x - y).num_milliseconds()),
        (Some(x), None) => match b.as_f64() {
            Some(ms) => date_value(x - Duration::milliseconds(ms as i64)),
            None => Value::Null,
        },
        (None, Some(_)) => Value::Null,
        (None, None) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => number_value(x - y),
            _ => Value::Null,
        },
    }
}

fn date_part(part: DateOperator, value: &Value) -> Value {
    let date = match as_date(value) {
        Some(date) => date,
        None => return Value::Null,
    };
    let n = match part {
        DateOperator::Year => date.year() as i64,
        DateOperator::Month => date.month() as i64,
        DateOperator::DayOfMonth => date.day() as i64,
        // 1 = Sunday
        DateOperator::DayOfWeek => date.weekday().number_from_sunday() as i64,
        DateOperator::Hour => date.hour() as i64,
        DateOperator::Minute => date.minute() as i64,
        DateOperator::Second => date.second() as i64,
    };
    Value::from(n)
}
