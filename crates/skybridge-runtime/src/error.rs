//! Errors surfaced to the guest as protocol error responses.

use skybridge_core::ErrorPayload;
use thiserror::Error;

/// Why a host capability could not produce a result.
///
/// None of these cross the orchestrator boundary as Rust errors: each one is
/// rendered into `{ error: { message } }` and sent back to the guest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    /// The host did not supply the callback backing this capability.
    #[error("{0} not provided")]
    NotProvided(&'static str),

    /// The runtime does not recognize the requested method.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// The request arguments did not match the method's shape.
    #[error("Invalid arguments for {method}: {reason}")]
    InvalidArguments {
        /// Method name.
        method: String,
        /// Decoding failure.
        reason: String,
    },

    /// The host callback failed with a message.
    #[error("{0}")]
    Failed(String),

    /// The callback did not settle within the configured timeout.
    #[error("{0} timed out")]
    TimedOut(String),

    /// The connection was torn down while the request was in flight.
    #[error("Connection disconnected")]
    Disconnected,

    /// The callback panicked.
    #[error("{}", ErrorPayload::FALLBACK_MESSAGE)]
    Panicked,
}

impl CallbackError {
    /// A host callback failure carrying `message`.
    #[must_use]
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }

    /// The wire error descriptor for this failure.
    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.to_string())
    }
}

impl From<CallbackError> for ErrorPayload {
    fn from(error: CallbackError) -> Self {
        error.to_payload()
    }
}

/// Result type for host callbacks.
pub type CallbackResult<T> = Result<T, CallbackError>;
