//! Observability for pathdoc
//!
//! - Structured JSON logging with a process-wide severity threshold
//! - Typed lifecycle events
//! - Atomic counters for store activity
//!
//! Observability is read-only: nothing here can fail or alter an operation.
//!
//! # Usage
//!
//! ```ignore
//! use pathdoc::observability::{log_event_with_fields, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! log_event_with_fields(Event::DocumentStored, &[("id", "4f2a..."), ("entries", "5")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Verifies no panic
        log_event(Event::SchemaEnsured);
        log_event_with_fields(Event::UnknownOperator, &[("operators", "~")]);
    }
}
