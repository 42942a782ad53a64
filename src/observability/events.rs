//! Observable events
//!
//! Events are explicit and typed; each carries a fixed severity.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Store tables checked or created
    SchemaEnsured,
    /// Document and its index entries committed
    DocumentStored,
    /// Document replaced under its existing identity
    DocumentUpdated,
    DocumentDeleted,
    /// A write transaction failed and was rolled back
    WriteRolledBack,
    /// Query tree turned into a predicate
    QueryTranslated,
    QueryExecuted,
    /// Predicate used an operator the engine does not evaluate
    UnknownOperator,
    /// Journal replay on open finished
    JournalReplayed,
    /// Journal failed verification (FATAL)
    JournalCorruption,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaEnsured => "SCHEMA_ENSURED",
            Event::DocumentStored => "DOCUMENT_STORED",
            Event::DocumentUpdated => "DOCUMENT_UPDATED",
            Event::DocumentDeleted => "DOCUMENT_DELETED",
            Event::WriteRolledBack => "WRITE_ROLLED_BACK",
            Event::QueryTranslated => "QUERY_TRANSLATED",
            Event::QueryExecuted => "QUERY_COMPLETE",
            Event::UnknownOperator => "UNKNOWN_OPERATOR",
            Event::JournalReplayed => "JOURNAL_REPLAY_COMPLETE",
            Event::JournalCorruption => "JOURNAL_CORRUPTION",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::DocumentStored
            | Event::DocumentUpdated
            | Event::DocumentDeleted
            | Event::QueryTranslated
            | Event::QueryExecuted => Severity::Trace,
            Event::SchemaEnsured | Event::JournalReplayed => Severity::Info,
            Event::WriteRolledBack | Event::UnknownOperator => Severity::Warn,
            Event::JournalCorruption => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
