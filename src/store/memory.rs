//! In-memory aggregation store
//!
//! Evaluates pipelines over a fixed set of JSON documents. Supports the
//! stages the engine emits: `$match`, `$addFields`, `$group`, `$project`,
//! `$sort`, `$skip`, `$limit` and `$count`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use super::expression::Expression;
use super::matcher::matches;
use super::value::{compare, group_key, number_value, resolve_field, set_field};
use crate::query::{PipelineRunner, RunFuture};

#[derive(Debug, Clone)]
enum Accumulator {
    Sum(Expression),
    Avg(Expression),
    Min(Expression),
    Max(Expression),
    Push(Expression),
}

enum AccumulatorState {
    Sum(f64),
    Avg { sum: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    Push(Vec<Value>),
}

impl Accumulator {
    fn parse(name: &str, spec: &Value) -> StoreResult<Self> {
        let (op, arg) = spec
            .as_object()
            .filter(|map| map.len() == 1)
            .and_then(|map| map.iter().next())
            .ok_or_else(|| {
                StoreError::invalid_stage(
                    "$group",
                    format!("accumulator '{}' needs one operator", name),
                )
            })?;
        let expr = Expression::parse(arg)?;
        match op.as_str() {
            "$sum" => Ok(Accumulator::Sum(expr)),
            "$avg" => Ok(Accumulator::Avg(expr)),
            "$min" => Ok(Accumulator::Min(expr)),
            "$max" => Ok(Accumulator::Max(expr)),
            "$push" => Ok(Accumulator::Push(expr)),
            other => Err(StoreError::UnsupportedOperator(other.to_string())),
        }
    }

    fn initial(&self) -> AccumulatorState {
        match self {
            Accumulator::Sum(_) => AccumulatorState::Sum(0.0),
            Accumulator::Avg(_) => AccumulatorState::Avg { sum: 0.0, count: 0 },
            Accumulator::Min(_) => AccumulatorState::Min(None),
            Accumulator::Max(_) => AccumulatorState::Max(None),
            Accumulator::Push(_) => AccumulatorState::Push(Vec::new()),
        }
    }

    fn update(&self, state: &mut AccumulatorState, doc: &Value) {
        match (self, state) {
            (Accumulator::Sum(expr), AccumulatorState::Sum(sum)) => {
                if let Some(n) = expr.eval(doc).as_f64() {
                    *sum += n;
                }
            }
            (Accumulator::Avg(expr), AccumulatorState::Avg { sum, count }) => {
                if let Some(n) = expr.eval(doc).as_f64() {
                    *sum += n;
                    *count += 1;
                }
            }
            (Accumulator::Min(expr), AccumulatorState::Min(current)) => {
                let value = expr.eval(doc);
                if !value.is_null() && current.as_ref().map_or(true, |c| compare(&value, c).is_lt()) {
                    *current = Some(value);
                }
            }
            (Accumulator::Max(expr), AccumulatorState::Max(current)) => {
                let value = expr.eval(doc);
                if !value.is_null() && current.as_ref().map_or(true, |c| compare(&value, c).is_gt()) {
                    *current = Some(value);
                }
            }
            (Accumulator::Push(expr), AccumulatorState::Push(items)) => items.push(expr.eval(doc)),
            _ => {}
        }
    }
}

impl AccumulatorState {
    fn finish(self) -> Value {
        match self {
            AccumulatorState::Sum(sum) => number_value(sum),
            AccumulatorState::Avg { count: 0, .. } => Value::Null,
            AccumulatorState::Avg { sum, count } => number_value(sum / count as f64),
            AccumulatorState::Min(value) | AccumulatorState::Max(value) => {
                value.unwrap_or(Value::Null)
            }
            AccumulatorState::Push(items) => Value::Array(items),
        }
    }
}

#[derive(Debug, Clone)]
enum Projection {
    Include,
    Exclude,
    Compute(Expression),
}

#[derive(Debug, Clone)]
enum Stage {
    Match(Value),
    AddFields(Vec<(String, Expression)>),
    Group {
        id: Expression,
        accumulators: Vec<(String, Accumulator)>,
    },
    Project(Vec<(String, Projection)>),
    Sort(Vec<(String, bool)>),
    Skip(usize),
    Limit(usize),
    Count(String),
}

impl Stage {
    fn parse(stage: &Value) -> StoreResult<Self> {
        let (name, spec) = stage
            .as_object()
            .filter(|map| map.len() == 1)
            .and_then(|map| map.iter().next())
            .ok_or_else(|| StoreError::invalid_stage("pipeline", "stage must have exactly one key"))?;

        match name.as_str() {
            "$match" => Ok(Stage::Match(spec.clone())),
            "$addFields" | "$set" => Ok(Stage::AddFields(
                object(name, spec)?
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), Expression::parse(v)?)))
                    .collect::<StoreResult<_>>()?,
            )),
            "$group" => {
                let spec = object(name, spec)?;
                let id = spec
                    .get("_id")
                    .ok_or_else(|| StoreError::invalid_stage(name, "requires '_id'"))?;
                let accumulators = spec
                    .iter()
                    .filter(|(k, _)| k.as_str() != "_id")
                    .map(|(k, v)| Ok((k.clone(), Accumulator::parse(k, v)?)))
                    .collect::<StoreResult<_>>()?;
                Ok(Stage::Group {
                    id: Expression::parse(id)?,
                    accumulators,
                })
            }
            "$project" => Ok(Stage::Project(
                object(name, spec)?
                    .iter()
                    .map(|(k, v)| {
                        let projection = match v {
                            Value::Bool(true) => Projection::Include,
                            Value::Bool(false) => Projection::Exclude,
                            Value::Number(n) if n.as_f64() == Some(0.0) => Projection::Exclude,
                            Value::Number(_) => Projection::Include,
                            other => Projection::Compute(Expression::parse(other)?),
                        };
                        Ok((k.clone(), projection))
                    })
                    .collect::<StoreResult<_>>()?,
            )),
            "$sort" => Ok(Stage::Sort(
                object(name, spec)?
                    .iter()
                    .map(|(k, v)| match v.as_i64() {
                        Some(1) => Ok((k.clone(), false)),
                        Some(-1) => Ok((k.clone(), true)),
                        _ => Err(StoreError::invalid_stage(name, "direction must be 1 or -1")),
                    })
                    .collect::<StoreResult<_>>()?,
            )),
            "$skip" => Ok(Stage::Skip(count_arg(name, spec)?)),
            "$limit" => Ok(Stage::Limit(count_arg(name, spec)?)),
            "$count" => match spec.as_str() {
                Some(field) if !field.is_empty() => Ok(Stage::Count(field.to_string())),
                _ => Err(StoreError::invalid_stage(name, "requires a field name")),
            },
            other => Err(StoreError::UnknownStage(other.to_string())),
        }
    }

    fn apply(&self, docs: Vec<Value>) -> StoreResult<Vec<Value>> {
        match self {
            Stage::Match(predicate) => {
                let mut kept = Vec::with_capacity(docs.len());
                for doc in docs {
                    if matches(&doc, predicate)? {
                        kept.push(doc);
                    }
                }
                Ok(kept)
            }
            Stage::AddFields(fields) => Ok(docs
                .into_iter()
                .map(|mut doc| {
                    for (name, expr) in fields {
                        if let Some(value) = expr.eval_opt(&doc) {
                            set_field(&mut doc, name, value);
                        }
                    }
                    doc
                })
                .collect()),
            Stage::Group { id, accumulators } => Ok(group(docs, id, accumulators)),
            Stage::Project(fields) => Ok(docs.into_iter().map(|doc| project(doc, fields)).collect()),
            Stage::Sort(fields) => {
                let mut docs = docs;
                docs.sort_by(|a, b| {
                    for (field, desc) in fields {
                        let left = resolve_field(a, field).unwrap_or(&Value::Null);
                        let right = resolve_field(b, field).unwrap_or(&Value::Null);
                        let ordering = compare(left, right);
                        let ordering = if *desc { ordering.reverse() } else { ordering };
                        if ordering.is_ne() {
                            return ordering;
                        }
                    }
                    std::cmp::Ordering::Equal
                });
                Ok(docs)
            }
            Stage::Skip(n) => Ok(docs.into_iter().skip(*n).collect()),
            Stage::Limit(n) => Ok(docs.into_iter().take(*n).collect()),
            Stage::Count(field) => {
                // no input, no output document
                if docs.is_empty() {
                    return Ok(Vec::new());
                }
                let mut result = Map::new();
                result.insert(field.clone(), Value::from(docs.len() as u64));
                Ok(vec![Value::Object(result)])
            }
        }
    }
}

fn object<'v>(stage: &str, spec: &'v Value) -> StoreResult<&'v Map<String, Value>> {
    spec.as_object()
        .ok_or_else(|| StoreError::invalid_stage(stage, "must be an object"))
}

fn count_arg(stage: &str, spec: &Value) -> StoreResult<usize> {
    spec.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| StoreError::invalid_stage(stage, "requires a non-negative integer"))
}

fn group(docs: Vec<Value>, id: &Expression, accumulators: &[(String, Accumulator)]) -> Vec<Value> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Value, Vec<AccumulatorState>)> = HashMap::new();

    for doc in &docs {
        let key = id.eval(doc);
        let text = group_key(&key);
        let (_, states) = groups.entry(text.clone()).or_insert_with(|| {
            order.push(text);
            let states = accumulators.iter().map(|(_, acc)| acc.initial()).collect();
            (key, states)
        });
        for ((_, acc), state) in accumulators.iter().zip(states.iter_mut()) {
            acc.update(state, doc);
        }
    }

    order
        .iter()
        .filter_map(|text| groups.remove(text))
        .map(|(key, states)| {
            let mut result = Map::new();
            result.insert("_id".to_string(), key);
            for ((name, _), state) in accumulators.iter().zip(states) {
                result.insert(name.clone(), state.finish());
            }
            Value::Object(result)
        })
        .collect()
}

/// Inclusion projection when anything is included or computed, exclusion
/// projection otherwise. `_id` is kept unless excluded.
fn project(doc: Value, fields: &[(String, Projection)]) -> Value {
    let inclusion = fields.iter().any(|(name, p)| match p {
        Projection::Compute(_) => true,
        Projection::Include => name != "_id",
        Projection::Exclude => false,
    });

    if !inclusion {
        let mut result = doc;
        if let Value::Object(map) = &mut result {
            for (name, _) in fields {
                map.remove(name);
            }
        }
        return result;
    }

    let mut result = Map::new();
    let id_excluded = fields
        .iter()
        .any(|(name, p)| name == "_id" && matches!(p, Projection::Exclude));
    if !id_excluded {
        if let Some(id) = doc.get("_id") {
            result.insert("_id".to_string(), id.clone());
        }
    }
    for (name, projection) in fields {
        let value = match projection {
            Projection::Include => resolve_field(&doc, name).cloned(),
            Projection::Compute(expr) => expr.eval_opt(&doc),
            Projection::Exclude => None,
        };
        if let Some(value) = value {
            result.insert(name.clone(), value);
        }
    }
    Value::Object(result)
}

/// A collection held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<Value>,
}

impl MemoryStore {
    pub fn new(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    /// Load a JSON array of documents from a file
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::Load(format!("{}: {}", path.display(), e)))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| StoreError::Load(format!("{}: {}", path.display(), e)))?;
        match value {
            Value::Array(documents) => Ok(Self::new(documents)),
            _ => Err(StoreError::Load(format!(
                "{}: expected an array of documents",
                path.display()
            ))),
        }
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Run `pipeline` synchronously. Every stage is parsed before any runs.
    pub fn aggregate(&self, pipeline: &[Value]) -> StoreResult<Vec<Value>> {
        let stages = pipeline.iter().map(Stage::parse).collect::<StoreResult<Vec<_>>>()?;
        let mut docs = self.documents.clone();
        for stage in &stages {
            docs = stage.apply(docs)?;
        }
        Ok(docs)
    }
}

impl PipelineRunner for MemoryStore {
    fn run<'a>(&'a self, pipeline: &'a [Value]) -> RunFuture<'a> {
        Box::pin(async move { self.aggregate(pipeline).map_err(Into::into) })
    }
}
