//! gridshape - compiles data-grid load options into aggregation pipelines
//!
//! Filtering, search, sorting, paging, multi-level grouping and summaries are
//! translated into document store aggregation stages. Execution is delegated
//! to a caller-supplied [`query::PipelineRunner`].

pub mod cli;
pub mod filter;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod store;

pub use query::{query, LoadOptions, QueryConfig, QueryEngine, QueryError, QueryResponse};
