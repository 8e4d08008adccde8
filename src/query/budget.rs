//! Per-request summary query budget
//!
//! Grouped requests with group summaries issue one summary query per group.
//! Without paging that can be thousands of queries, so each request carries
//! a ceiling. The budget is created per request and shared by reference
//! across every recursion level.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::observability::{log_event, Event};

#[derive(Debug)]
pub struct SummaryBudget {
    limit: Option<u32>,
    attempts: AtomicU32,
    exhaustion_logged: AtomicBool,
}

impl SummaryBudget {
    /// `None` means unlimited
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            limit,
            attempts: AtomicU32::new(0),
            exhaustion_logged: AtomicBool::new(false),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Counts one attempt; true when the attempt is within the ceiling.
    /// The first refusal logs a warning, later ones are silent.
    pub fn try_acquire(&self) -> bool {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        match self.limit {
            None => true,
            Some(limit) if attempt <= limit => true,
            Some(limit) => {
                self.mark_exhausted(limit);
                false
            }
        }
    }

    fn mark_exhausted(&self, limit: u32) {
        if !self.exhaustion_logged.swap(true, Ordering::Relaxed) {
            log_event(
                Event::SummaryBudgetExhausted,
                &[("limit", &limit.to_string())],
            );
        }
    }

    /// Attempts so far, granted or not
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Attempts granted so far
    pub fn granted(&self) -> u32 {
        let attempts = self.attempts();
        match self.limit {
            Some(limit) => attempts.min(limit),
            None => attempts,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhaustion_logged.load(Ordering::Relaxed)
    }
}
