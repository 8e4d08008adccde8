//! Query execution
//!
//! Turns [`LoadOptions`] into pipelines, runs them through a
//! [`PipelineRunner`] and assembles a [`QueryResponse`].
//!
//! ```ignore
//! let engine = QueryEngine::new(store);
//! let options = LoadOptions::from_json(r#"{"filter": ["amount", ">", 100], "requireTotalCount": true}"#)?;
//! let response = engine.query(&options).await?;
//! ```

mod budget;
mod config;
mod context;
mod engine;
mod errors;
mod group;
mod ids;
mod options;
mod result;
mod runner;

pub use budget::SummaryBudget;
pub use config::QueryConfig;
pub use context::QueryContext;
pub use engine::{query, QueryEngine};
pub use errors::{QueryError, QueryResult};
pub use group::GroupQuery;
pub use ids::{IdentifierNormalizer, KeepIdentifiers, ObjectIdNormalizer};
pub use options::{GroupInfo, LoadOptions, SearchExpr, SortInfo, SummaryInfo, SummaryType};
pub use result::{GroupItem, GroupItems, QueryResponse, ResponseData};
pub use runner::{PipelineRunner, RunFuture};
