//! Engine error types
//!
//! Error codes:
//! - PATHDOC_ENGINE_SCHEMA (ERROR): unknown table, column or alias
//! - PATHDOC_ENGINE_CONSTRAINT (ERROR): key, foreign key or NOT NULL violation
//! - PATHDOC_ENGINE_TRANSACTION (ERROR): misuse of begin/commit/rollback
//! - PATHDOC_ENGINE_QUERY (ERROR): unbound parameter
//! - PATHDOC_ENGINE_IO (ERROR): journal I/O failure
//! - PATHDOC_DATA_CORRUPTION (FATAL): journal checksum or framing failure
//! - PATHDOC_JOURNAL_POISONED (FATAL): a partial record could not be cut off

use std::io;

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Relational engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Unknown table alias: {0}")]
    UnknownAlias(String),

    #[error("Duplicate primary key '{key}' in table '{table}'")]
    DuplicateKey { table: String, key: String },

    #[error("Foreign key violation on {table}.{column}: {reason}")]
    ForeignKeyViolation {
        table: String,
        column: String,
        reason: String,
    },

    #[error("Column {table}.{column} does not accept NULL")]
    NotNullViolation { table: String, column: String },

    #[error("A transaction is already active")]
    TransactionActive,

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Unbound query parameter :{0}")]
    UnboundParameter(String),

    #[error("Journal I/O failed: {message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("Journal encoding failed: {0}")]
    Encoding(String),

    #[error("Journal corruption at byte offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    #[error("Journal refuses appends: a partial record past byte offset {offset} could not be removed")]
    JournalPoisoned { offset: u64 },
}

impl EngineError {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        EngineError::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a corruption error at a journal offset
    pub fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        EngineError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::TableNotFound(_)
            | EngineError::UnknownColumn { .. }
            | EngineError::UnknownAlias(_) => "PATHDOC_ENGINE_SCHEMA",
            EngineError::DuplicateKey { .. }
            | EngineError::ForeignKeyViolation { .. }
            | EngineError::NotNullViolation { .. } => "PATHDOC_ENGINE_CONSTRAINT",
            EngineError::TransactionActive | EngineError::NoActiveTransaction => "PATHDOC_ENGINE_TRANSACTION",
            EngineError::UnboundParameter(_) => "PATHDOC_ENGINE_QUERY",
            EngineError::Io { .. } | EngineError::Encoding(_) => "PATHDOC_ENGINE_IO",
            EngineError::Corruption { .. } => "PATHDOC_DATA_CORRUPTION",
            EngineError::JournalPoisoned { .. } => "PATHDOC_JOURNAL_POISONED",
        }
    }

    /// True when the journal can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Corruption { .. } | EngineError::JournalPoisoned { .. })
    }
}
