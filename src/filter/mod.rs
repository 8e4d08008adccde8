//! Filter expressions
//!
//! Data-grid clients send filters as nested JSON arrays:
//!
//! ```text
//! [["price", ">", 10], "and", ["name", "startswith", "A"]]
//! ```
//!
//! This module parses that grammar into a [`FilterExpr`] tree and compiles it
//! into a store predicate (`{"$and": [{"price": {"$gt": 10}}, ...]}`).
//! Anything malformed compiles to `None`, which callers treat as "no filter".

mod ast;
mod compiler;
mod date_fields;

pub use ast::{Combinator, CompareOp, FilterExpr};
pub use compiler::{compile, CompiledFilter, FilterCompiler};
pub use date_fields::{predicate_field, DatePartField};
