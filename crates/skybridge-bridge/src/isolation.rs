//! Content-derived isolation keys.
//!
//! Two payloads with different content must never share an isolated origin,
//! and the same payload must land on the same origin every time. The key is
//! the lowercase hex SHA-256 digest of the raw payload bytes.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Length of [`IsolationKey::short`].
const SHORT_LEN: usize = 12;

/// SHA-256 digest of a payload, used to salt the rendering surface's origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IsolationKey(String);

impl IsolationKey {
    /// Derive the key for `payload`.
    #[must_use]
    pub fn derive(payload: &str) -> Self {
        Self(hex::encode(Sha256::digest(payload.as_bytes())))
    }

    /// Full 64-character hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log fields and origin labels.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..SHORT_LEN).unwrap_or(&self.0)
    }
}

impl fmt::Display for IsolationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IsolationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let key = IsolationKey::derive("");
        assert_eq!(
            key.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(key.short(), "e3b0c44298fc");
    }

    #[test]
    fn test_same_payload_same_key() {
        let a = IsolationKey::derive("<p>hello</p>");
        let b = IsolationKey::derive("<p>hello</p>");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_payload_different_key() {
        let a = IsolationKey::derive("<p>hello</p>");
        let b = IsolationKey::derive("<p>hello!</p>");
        assert_ne!(a, b);
        assert_ne!(a.short(), b.short());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let key = IsolationKey::derive("x");
        assert_eq!(
            serde_json::to_value(&key).unwrap(),
            serde_json::Value::String(key.to_string())
        );
    }
}
