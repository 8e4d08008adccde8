//! Filter compiler
//!
//! Turns a wire filter expression into a store predicate document and
//! records which fields the emitted predicate references.

use serde_json::{Map, Value};

use super::ast::{CompareOp, FilterExpr};
use super::date_fields::predicate_field;
use crate::pipeline::single;

/// Output of [`compile`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledFilter {
    /// `None` when the expression is malformed or unsupported
    pub predicate: Option<Value>,
    /// Fields referenced by the predicate, in encounter order, without repeats
    pub fields: Vec<String>,
}

/// Compiles a wire filter expression
pub fn compile(expr: &Value) -> CompiledFilter {
    let mut compiler = FilterCompiler::new();
    let predicate = FilterExpr::parse(expr).map(|tree| compiler.compile(&tree));
    CompiledFilter {
        predicate,
        fields: compiler.into_fields(),
    }
}

/// Walks a [`FilterExpr`] tree, emitting predicates and collecting fields
#[derive(Debug, Default)]
pub struct FilterCompiler {
    fields: Vec<String>,
}

impl FilterCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles a parsed tree. Parsing already discarded everything invalid,
    /// so every node produces a predicate.
    pub fn compile(&mut self, expr: &FilterExpr) -> Value {
        match expr {
            FilterExpr::Field(field) => self.leaf(field, single("$eq", Value::Bool(true))),
            FilterExpr::Not(inner) => single("$nor", Value::Array(vec![self.compile(inner)])),
            FilterExpr::Compare { field, op, value } => {
                let condition = condition(*op, value);
                self.leaf(field, condition)
            }
            FilterExpr::Chain { op, operands } => {
                let list = operands.iter().map(|o| self.compile(o)).collect();
                single(op.keyword(), Value::Array(list))
            }
        }
    }

    fn leaf(&mut self, field: &str, condition: Value) -> Value {
        if !self.fields.iter().any(|f| f == field) {
            self.fields.push(field.to_string());
        }
        single(&predicate_field(field), condition)
    }

    /// Fields recorded so far
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

fn condition(op: CompareOp, value: &Value) -> Value {
    if let Some(keyword) = op.keyword() {
        return single(keyword, value.clone());
    }

    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let pattern = op.pattern(&text).unwrap_or(text);

    let mut regex = Map::new();
    regex.insert("$regex".to_string(), Value::String(pattern));
    regex.insert("$options".to_string(), Value::String(String::new()));
    Value::Object(regex)
}
