//! Configuration sections.
//!
//! Every section is `#[serde(default)]`, so an empty file (or no file at
//! all) yields a complete configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Isolated rendering surface parameters.
    pub surface: SurfaceSection,
    /// Capability runtime request policy.
    pub runtime: RuntimeSection,
    /// Logging and tracing configuration.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// SurfaceSection
// ---------------------------------------------------------------------------

/// Origin namespace and sandbox policy for rendered widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSection {
    /// DNS label under which per-payload origins are minted.
    pub product: String,
    /// Sandbox tokens granted to every surface.
    pub sandbox: Vec<String>,
}

impl Default for SurfaceSection {
    fn default() -> Self {
        Self {
            product: "openskybridge".to_owned(),
            sandbox: vec!["allow-scripts".to_owned()],
        }
    }
}

// ---------------------------------------------------------------------------
// RuntimeSection
// ---------------------------------------------------------------------------

/// How the capability runtime treats guest requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Fail a request whose host callback has not settled after this many
    /// milliseconds. Unset means requests may stay pending indefinitely.
    pub request_timeout_ms: Option<u64>,
    /// Answer every in-flight request with an error when the connection is
    /// torn down.
    pub reject_pending_on_disconnect: bool,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["skybridge_runtime=trace"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
