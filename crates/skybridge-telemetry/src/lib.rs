//! Skybridge Telemetry - Logging for the Skybridge widget bridge.
//!
//! This crate provides:
//! - [`LogConfig`], a serializable description of the log level, format,
//!   target and per-crate directives
//! - [`setup_logging`], which installs a global `tracing` subscriber built
//!   from that description
//!
//! The bridge crates only emit `tracing` events; nothing is printed unless
//! the host installs a subscriber, with this crate or its own.
//!
//! # Example
//!
//! ```rust,no_run
//! use skybridge_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), skybridge_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("skybridge_runtime=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
