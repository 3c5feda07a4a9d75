//! Core error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A message could not be serialized into a structured value.
    #[error("failed to encode {kind} message: {source}")]
    Encode {
        /// The message kind being encoded.
        kind: &'static str,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A message carried a recognized type tag but a malformed body.
    #[error("malformed {kind} message: {source}")]
    Malformed {
        /// The message kind that failed to decode.
        kind: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
