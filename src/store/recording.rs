//! Pipeline recording
//!
//! Wraps a runner and keeps every pipeline it executed, in order. Used by
//! `explain` and by tests that check which queries a request issued.

use std::sync::Mutex;

use serde_json::Value;

use crate::query::{PipelineRunner, RunFuture};

pub struct RecordingRunner<R> {
    inner: R,
    pipelines: Mutex<Vec<Vec<Value>>>,
}

impl<R: PipelineRunner> RecordingRunner<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pipelines: Mutex::new(Vec::new()),
        }
    }

    /// Every pipeline run so far
    pub fn pipelines(&self) -> Vec<Vec<Value>> {
        match self.pipelines.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Pipelines whose stages satisfy `predicate`
    pub fn count_matching(&self, predicate: impl Fn(&[Value]) -> bool) -> usize {
        self.pipelines().iter().filter(|p| predicate(p)).count()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn record(&self, pipeline: &[Value]) {
        let mut guard = match self.pipelines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(pipeline.to_vec());
    }
}

impl<R: PipelineRunner> PipelineRunner for RecordingRunner<R> {
    fn run<'a>(&'a self, pipeline: &'a [Value]) -> RunFuture<'a> {
        self.record(pipeline);
        self.inner.run(pipeline)
    }
}
