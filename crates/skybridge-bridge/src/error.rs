//! Error types for the bridge orchestrator.

use thiserror::Error;

/// Host-side integration failures.
///
/// Protocol failures never appear here: they are answered to the guest as
/// error responses by the runtime.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The rendering surface could not materialize a viewport.
    #[error("surface error: {0}")]
    Surface(String),

    /// The materialized viewport reported an unusable origin.
    #[error("invalid surface origin: {0:?}")]
    InvalidOrigin(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] skybridge_core::CoreError),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
