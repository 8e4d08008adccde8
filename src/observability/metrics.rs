//! Query counters
//!
//! Counters only, monotonic, lock-free. One registry per [`crate::QueryEngine`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Registry of operational counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    requests: AtomicU64,
    requests_failed: AtomicU64,
    pipelines_executed: AtomicU64,
    count_queries: AtomicU64,
    summary_queries: AtomicU64,
    summary_queries_skipped: AtomicU64,
    groups_materialized: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requests_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pipelines(&self) {
        self.pipelines_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_count_queries(&self) {
        self.count_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_summary_queries(&self) {
        self.summary_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_summary_skipped(&self) {
        self.summary_queries_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Add the number of group items returned by one level query
    pub fn add_groups(&self, n: u64) {
        self.groups_materialized.fetch_add(n, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            pipelines_executed: self.pipelines_executed.load(Ordering::Relaxed),
            count_queries: self.count_queries.load(Ordering::Relaxed),
            summary_queries: self.summary_queries.load(Ordering::Relaxed),
            summary_queries_skipped: self.summary_queries_skipped.load(Ordering::Relaxed),
            groups_materialized: self.groups_materialized.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`MetricsRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub requests_failed: u64,
    pub pipelines_executed: u64,
    pub count_queries: u64,
    pub summary_queries: u64,
    pub summary_queries_skipped: u64,
    pub groups_materialized: u64,
}
