//! Document store errors
//!
//! Error codes:
//! - PATHDOC_UNSUPPORTED_LEAF_TYPE: document holds a non-storable value
//! - PATHDOC_TRANSACTION_FAILED: write failed and was rolled back
//! - PATHDOC_CODEC_*: blob encode/decode failure
//! - PATHDOC_ENGINE_*: engine failure outside a write transaction
//! - PATHDOC_MALFORMED_ROW: engine returned a row of the wrong shape

use thiserror::Error;

use crate::document::CodecError;
use crate::engine::EngineError;
use crate::flatten::FlattenError;

/// Result type for document store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    UnsupportedLeafType(#[from] FlattenError),

    #[error("Transaction rolled back: {source}")]
    TransactionFailure {
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Malformed row from {table}: {reason}")]
    MalformedRow { table: String, reason: String },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::UnsupportedLeafType(e) => e.code(),
            StoreError::TransactionFailure { .. } => "PATHDOC_TRANSACTION_FAILED",
            StoreError::Codec(e) => e.code(),
            StoreError::Engine(e) => e.code(),
            StoreError::MalformedRow { .. } => "PATHDOC_MALFORMED_ROW",
        }
    }

    /// True if the underlying storage can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        match self {
            StoreError::TransactionFailure { source } | StoreError::Engine(source) => source.is_fatal(),
            _ => false,
        }
    }

    pub(crate) fn malformed(table: &str, reason: impl Into<String>) -> Self {
        StoreError::MalformedRow {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through() {
        let leaf: StoreError = FlattenError::UnsupportedLeafType {
            path: "files".into(),
            type_name: "stream".into(),
        }
        .into();
        assert_eq!(leaf.code(), "PATHDOC_UNSUPPORTED_LEAF_TYPE");
        assert!(leaf.to_string().contains("files"));

        let failed = StoreError::TransactionFailure {
            source: EngineError::NoActiveTransaction,
        };
        assert_eq!(failed.code(), "PATHDOC_TRANSACTION_FAILED");
        assert!(!failed.is_fatal());

        let corrupt: StoreError = EngineError::corruption(4, "bad crc").into();
        assert_eq!(corrupt.code(), "PATHDOC_DATA_CORRUPTION");
        assert!(corrupt.is_fatal());
    }
}
