//! Configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Log levels accepted by `logging.level`.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Formats accepted by `logging.format`.
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Maximum length of a DNS label.
const MAX_LABEL_LEN: usize = 63;

/// Validate a deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_surface(config)?;
    validate_runtime(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_surface(config: &Config) -> ConfigResult<()> {
    let s = &config.surface;

    if !is_dns_label(&s.product) {
        return Err(ConfigError::ValidationError {
            field: "surface.product".to_owned(),
            message: format!(
                "'{}' is not a valid DNS label; use 1-{MAX_LABEL_LEN} lowercase letters, digits or '-'",
                s.product
            ),
        });
    }

    if let Some(token) = s.sandbox.iter().find(|t| !t.starts_with("allow-")) {
        return Err(ConfigError::ValidationError {
            field: "surface.sandbox".to_owned(),
            message: format!("sandbox token '{token}' must start with 'allow-'"),
        });
    }

    let has = |token: &str| s.sandbox.iter().any(|t| t == token);
    if !has("allow-scripts") {
        return Err(ConfigError::ValidationError {
            field: "surface.sandbox".to_owned(),
            message: "'allow-scripts' is required for the runtime bootstrap to run".to_owned(),
        });
    }
    if has("allow-same-origin") {
        return Err(ConfigError::ValidationError {
            field: "surface.sandbox".to_owned(),
            message: "'allow-same-origin' with 'allow-scripts' lets the guest escape its isolated origin"
                .to_owned(),
        });
    }

    Ok(())
}

fn validate_runtime(config: &Config) -> ConfigResult<()> {
    if config.runtime.request_timeout_ms == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "runtime.request_timeout_ms".to_owned(),
            message: "timeout must be greater than zero; omit it to disable".to_owned(),
        });
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unknown level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if !LOG_FORMATS.contains(&l.format.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unknown format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        });
    }

    Ok(())
}

fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
