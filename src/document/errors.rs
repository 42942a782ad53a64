//! Blob codec errors

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding a document blob
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Document could not be encoded (e.g. it holds an opaque value)
    #[error("Failed to encode document: {0}")]
    Encode(String),

    /// Stored bytes are not a valid document
    #[error("Failed to decode document: {0}")]
    Decode(String),
}

impl CodecError {
    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::Encode(_) => "PATHDOC_CODEC_ENCODE_FAILED",
            CodecError::Decode(_) => "PATHDOC_CODEC_DECODE_FAILED",
        }
    }
}
