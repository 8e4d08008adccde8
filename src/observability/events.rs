//! Observable events
//!
//! Events are explicit and typed. Request begin/complete records come from
//! [`super::ObservationScope`]; everything else is listed here.

use std::fmt;

use super::logger::Severity;

/// Observable events in gridshape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration loaded from file
    ConfigLoaded,
    /// A pipeline is handed to the runner
    PipelineExecute,
    /// A filter or search clause compiled to no predicate
    FilterDiscarded,
    /// One group level was queried
    GroupLevelQueried,
    /// The per-request summary ceiling was hit
    SummaryBudgetExhausted,
}

impl Event {
    /// Returns the event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::PipelineExecute => "PIPELINE_EXECUTE",
            Event::FilterDiscarded => "FILTER_DISCARDED",
            Event::GroupLevelQueried => "GROUP_LEVEL_QUERIED",
            Event::SummaryBudgetExhausted => "SUMMARY_BUDGET_EXHAUSTED",
        }
    }

    /// Returns the severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ConfigLoaded => Severity::Info,
            Event::SummaryBudgetExhausted => Severity::Warn,
            Event::PipelineExecute | Event::FilterDiscarded | Event::GroupLevelQueried => {
                Severity::Trace
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
