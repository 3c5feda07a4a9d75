//! Bridge from `skybridge_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates. This module
//! translates its sections into the option types the runtime, the surface
//! and the logger consume, so that conversion happens in one place.

use std::time::Duration;

use skybridge_config::Config;
use skybridge_runtime::RuntimeOptions;
use skybridge_telemetry::{LogConfig, LogFormat};

use crate::surface::{SandboxPolicy, SurfaceOptions};

/// Convert config to [`RuntimeOptions`].
#[must_use]
pub fn to_runtime_options(cfg: &Config) -> RuntimeOptions {
    RuntimeOptions {
        request_timeout: cfg.runtime.request_timeout_ms.map(Duration::from_millis),
        reject_pending_on_disconnect: cfg.runtime.reject_pending_on_disconnect,
    }
}

/// Convert config to [`SurfaceOptions`].
#[must_use]
pub fn to_surface_options(cfg: &Config) -> SurfaceOptions {
    SurfaceOptions {
        product: cfg.surface.product.clone(),
        sandbox: SandboxPolicy::new(cfg.surface.sandbox.iter().cloned()),
    }
}

/// Convert config to [`LogConfig`].
///
/// An unrecognized format falls back to the default; [`Config::validate`]
/// rejects those before they get here.
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or_default();
    let mut log = LogConfig::new(cfg.logging.level.to_ascii_lowercase()).with_format(format);
    if format == LogFormat::Json {
        log = log.without_ansi();
    }
    for directive in &cfg.logging.directives {
        log = log.with_directive(directive.clone());
    }
    log
}
