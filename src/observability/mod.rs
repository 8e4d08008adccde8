//! Observability for gridshape
//!
//! - Structured logging (JSON lines on stderr)
//! - Query counters
//! - Begin/complete scopes around requests
//!
//! Observability is read-only: nothing here can fail a request.
//!
//! ```ignore
//! use gridshape::observability::{log_event, Event};
//!
//! log_event(Event::SummaryBudgetExhausted, &[("limit", "100")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log a typed event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::ConfigLoaded, &[("path", "/tmp/gridshape.json")]);
        log_event(Event::PipelineExecute, &[("stages", "3")]);
    }
}
