//! Pipeline execution seam
//!
//! The engine never talks to a store directly. It hands finished stage
//! sequences to a [`PipelineRunner`] and reads back the result documents.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use super::errors::QueryResult;

/// Future returned by [`PipelineRunner::run`]
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = QueryResult<Vec<Value>>> + Send + 'a>>;

/// Executes one aggregation pipeline against the target collection
pub trait PipelineRunner: Send + Sync {
    /// Run the stages in order and collect every result document.
    /// Failures are reported as [`QueryError::Execution`](super::QueryError::Execution).
    fn run<'a>(&'a self, pipeline: &'a [Value]) -> RunFuture<'a>;
}

impl<R: PipelineRunner + ?Sized> PipelineRunner for &R {
    fn run<'a>(&'a self, pipeline: &'a [Value]) -> RunFuture<'a> {
        (**self).run(pipeline)
    }
}

impl<R: PipelineRunner + ?Sized> PipelineRunner for Arc<R> {
    fn run<'a>(&'a self, pipeline: &'a [Value]) -> RunFuture<'a> {
        (**self).run(pipeline)
    }
}

impl<R: PipelineRunner + ?Sized> PipelineRunner for Box<R> {
    fn run<'a>(&'a self, pipeline: &'a [Value]) -> RunFuture<'a> {
        (**self).run(pipeline)
    }
}
