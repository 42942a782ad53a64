//! Flattening errors

use thiserror::Error;

/// Result type for flattening
pub type FlattenResult<T> = Result<T, FlattenError>;

/// Errors raised while flattening a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlattenError {
    /// A leaf is neither a scalar nor a container
    #[error("Unsupported type of document under the path '{path}' ({type_name})")]
    UnsupportedLeafType { path: String, type_name: String },
}

impl FlattenError {
    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            FlattenError::UnsupportedLeafType { .. } => "PATHDOC_UNSUPPORTED_LEAF_TYPE",
        }
    }

    /// Path of the offending value
    pub fn path(&self) -> &str {
        match self {
            FlattenError::UnsupportedLeafType { path, .. } => path,
        }
    }
}
