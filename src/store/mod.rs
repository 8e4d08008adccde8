//! In-memory reference store
//!
//! A [`PipelineRunner`](crate::query::PipelineRunner) that evaluates the
//! emitted stage vocabulary over JSON documents, so requests can be run
//! without a database. Used by the CLI and the test suite.

mod errors;
mod expression;
mod matcher;
mod memory;
mod recording;
mod value;

pub use errors::{StoreError, StoreResult};
pub use expression::{DateOperator, Expression};
pub use matcher::matches;
pub use memory::MemoryStore;
pub use recording::RecordingRunner;
pub use value::{as_date, compare, date_value, resolve_field, values_equal};
