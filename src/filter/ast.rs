//! Filter expression tree
//!
//! The wire grammar is array based and ambiguous:
//!
//! - `"field"`: field is truthy
//! - `["!", expr]`: negation
//! - `[field, op, value]`: comparison
//! - `[expr, "and", expr, "and", expr, ...]`: homogeneous and/or chain
//! - `[expr]`: redundant wrapping
//!
//! [`FilterExpr::parse`] resolves the grammar into a tagged tree. Anything
//! that does not fit parses to `None`; inside a chain such operands are dropped.

use serde_json::Value;

/// Boolean combinator of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    /// Parses `and`/`or`, case-insensitively
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "and" => Some(Combinator::And),
            "or" => Some(Combinator::Or),
            _ => None,
        }
    }

    /// Store keyword for this combinator
    pub fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => "$and",
            Combinator::Or => "$or",
        }
    }
}

/// Binary comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    StartsWith,
    EndsWith,
    Contains,
    NotContains,
}

impl CompareOp {
    /// Parses an operator token, case-insensitively
    pub fn parse(token: &str) -> Option<Self> {
        let op = match token.to_ascii_lowercase().as_str() {
            "=" => CompareOp::Eq,
            "<>" => CompareOp::Ne,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Gte,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Lte,
            "startswith" => CompareOp::StartsWith,
            "endswith" => CompareOp::EndsWith,
            "contains" => CompareOp::Contains,
            "notcontains" => CompareOp::NotContains,
            _ => return None,
        };
        Some(op)
    }

    /// Store keyword for the ordering operators, `None` for pattern operators
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            CompareOp::Eq => Some("$eq"),
            CompareOp::Ne => Some("$ne"),
            CompareOp::Gt => Some("$gt"),
            CompareOp::Gte => Some("$gte"),
            CompareOp::Lt => Some("$lt"),
            CompareOp::Lte => Some("$lte"),
            _ => None,
        }
    }

    /// Regular expression for the pattern operators
    pub fn pattern(&self, text: &str) -> Option<String> {
        match self {
            CompareOp::StartsWith => Some(format!("^{}", text)),
            CompareOp::EndsWith => Some(format!("{}$", text)),
            CompareOp::Contains => Some(text.to_string()),
            CompareOp::NotContains => Some(format!("^((?!{}).)*$", text)),
            _ => None,
        }
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Bare field name, "field equals true"
    Field(String),
    /// `["!", operand]`
    Not(Box<FilterExpr>),
    /// `[field, op, value]`
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// `[a, op, b, op, c, ...]` with the operands that parsed
    Chain {
        op: Combinator,
        operands: Vec<FilterExpr>,
    },
}

impl FilterExpr {
    /// Parses a wire expression; `None` means "no filter"
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => field_name(name).map(FilterExpr::Field),
            Value::Array(items) => Self::parse_array(items),
            _ => None,
        }
    }

    fn parse_array(items: &[Value]) -> Option<Self> {
        match items.len() {
            1 => Self::parse(&items[0]),
            2 => Self::parse_unary(&items[0], &items[1]),
            n if n % 2 == 1 => {
                let token = items[1].as_str()?;
                if Combinator::parse(token).is_some() {
                    Self::parse_chain(items)
                } else if n == 3 {
                    Self::parse_comparison(items)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn parse_unary(op: &Value, operand: &Value) -> Option<Self> {
        match op.as_str() {
            Some("!") => Self::parse(operand).map(|inner| FilterExpr::Not(Box::new(inner))),
            _ => None,
        }
    }

    /// Operands that fail to parse are dropped. A chain left with no
    /// operand is discarded as a whole, so an `or` chain of invalid
    /// operands under-filters (matches everything) instead of matching
    /// nothing.
    fn parse_chain(items: &[Value]) -> Option<Self> {
        let op = items[1].as_str().and_then(Combinator::parse)?;
        let homogeneous = items
            .iter()
            .skip(1)
            .step_by(2)
            .all(|token| token.as_str().and_then(Combinator::parse) == Some(op));
        if !homogeneous {
            return None;
        }

        let operands: Vec<FilterExpr> = items.iter().step_by(2).filter_map(Self::parse).collect();
        if operands.is_empty() {
            return None;
        }
        Some(FilterExpr::Chain { op, operands })
    }

    fn parse_comparison(items: &[Value]) -> Option<Self> {
        let field = items[0].as_str().and_then(field_name)?;
        let op = items[1].as_str().and_then(CompareOp::parse)?;
        Some(FilterExpr::Compare {
            field,
            op,
            value: items[2].clone(),
        })
    }
}

/// A field name starts with an alphanumeric character or `_`
fn field_name(name: &str) -> Option<String> {
    let first = name.chars().next()?;
    if first.is_alphanumeric() || first == '_' {
        Some(name.to_string())
    } else {
        None
    }
}
