//! Bootstrap injection into guest markup.
//!
//! The runtime's bootstrap must run before any guest script, so it is placed
//! right after the opening `<head>` tag. Payloads without a head get one
//! synthesized after `<html>`; bare fragments get the code prepended.

use std::sync::LazyLock;

use regex::Regex;

static HEAD_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("invalid regex"));

static HTML_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html(?:\s[^>]*)?>").expect("invalid regex"));

/// Insert `code` at the top of the payload's head section.
///
/// Only the first matching tag is used. Tag matching is case-insensitive and
/// tolerates attributes (`<HEAD data-x="1">`), but does not match tags that
/// merely share a prefix (`<header>`).
#[must_use]
pub fn inject_bootstrap(payload: &str, code: &str) -> String {
    if let Some(m) = HEAD_OPEN.find(payload) {
        return splice(payload, m.end(), code);
    }
    if let Some(m) = HTML_OPEN.find(payload) {
        return splice(payload, m.end(), &format!("<head>{code}</head>"));
    }
    let mut out = String::with_capacity(payload.len().saturating_add(code.len()));
    out.push_str(code);
    out.push_str(payload);
    out
}

fn splice(payload: &str, at: usize, insert: &str) -> String {
    let (before, after) = payload.split_at(at);
    let mut out = String::with_capacity(payload.len().saturating_add(insert.len()));
    out.push_str(before);
    out.push_str(insert);
    out.push_str(after);
    out
}
