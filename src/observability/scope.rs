//! Begin/complete logging around one unit of work
//!
//! - `{name}_BEGIN` on creation (INFO)
//! - `{name}_COMPLETE` with `elapsed_ms` on [`ObservationScope::complete`] (INFO)
//! - `{name}_FAILED` with the error code on [`ObservationScope::fail`] (ERROR)
//! - `{name}_INCOMPLETE` if dropped unfinished, e.g. a cancelled future (WARN)

use std::time::Instant;

use super::logger::Logger;

/// A scope that logs its own start and outcome
pub struct ObservationScope {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
    started: Instant,
    finished: bool,
}

impl ObservationScope {
    /// Create a scope, logging `{name}_BEGIN`
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a scope whose fields are repeated on every record it logs
    pub fn with_fields(name: &'static str, fields: &[(&'static str, &str)]) -> Self {
        let scope = Self {
            name,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
            finished: false,
        };
        Logger::info(&format!("{}_BEGIN", name), &scope.field_refs());
        scope
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    /// Milliseconds since the scope was opened
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    /// Mark the scope as successfully completed
    pub fn complete(mut self) {
        self.finished = true;
        let elapsed = self.elapsed_ms().to_string();
        let mut fields = self.field_refs();
        fields.push(("elapsed_ms", &elapsed));
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }

    /// Mark the scope as failed
    pub fn fail(mut self, code: &str, message: &str) {
        self.finished = true;
        let mut fields = self.field_refs();
        fields.push(("code", code));
        fields.push(("message", message));
        Logger::error(&format!("{}_FAILED", self.name), &fields);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_starts_unfinished() {
        let scope = ObservationScope::new("TEST");
        assert!(!scope.is_finished());
        scope.complete();
    }

    #[test]
    fn test_scope_with_fields_fail() {
        let scope = ObservationScope::with_fields("TEST", &[("mode", "flat")]);
        scope.fail("GRID_EXECUTION_FAILED", "store unreachable");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new("TEST");
        drop(scope);
    }
}
