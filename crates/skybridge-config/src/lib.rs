//! Configuration for the Skybridge widget bridge.
//!
//! This crate provides a single [`Config`] type covering the rendering
//! surface, the capability runtime's request policy and logging.
//!
//! # Usage
//!
//! ```rust,no_run
//! use skybridge_config::Config;
//!
//! let config = Config::load(Some(std::path::Path::new("skybridge.toml"))).unwrap();
//! println!("Surfaces live under: {}", config.surface.product);
//! ```
//!
//! # Configuration Precedence
//!
//! 1. **File** (the path passed to [`Config::load`])
//! 2. **Environment variables** (`SKYBRIDGE_*`): fallback only
//! 3. **Defaults**
//!
//! # Design
//!
//! This crate has **no dependencies on other internal skybridge crates**.
//! Conversion to domain types happens in `skybridge_bridge::config_bridge`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable fallback resolution.
pub mod env;
/// Configuration validation.
pub mod validate;

mod error;
mod loader;
mod types;

use std::collections::HashMap;
use std::path::Path;

pub use error::{ConfigError, ConfigResult};
pub use types::{Config, LoggingSection, RuntimeSection, SurfaceSection};

impl Config {
    /// Load from an optional file with `SKYBRIDGE_*` env fallbacks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if loading or validation fails.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Like [`Config::load`], reading env fallbacks from `env_vars` instead
    /// of the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if loading or validation fails.
    pub fn load_with_env<S: ::std::hash::BuildHasher>(
        path: Option<&Path>,
        env_vars: &HashMap<String, String, S>,
    ) -> ConfigResult<Self> {
        loader::load_with_env(path, env_vars)
    }

    /// Load a single file without env fallbacks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Validate this configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}
