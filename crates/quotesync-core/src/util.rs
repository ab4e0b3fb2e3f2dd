//! Shared normalization helpers used across multiple modules.

use crate::error::{Error, Result};

/// Trim a value and return `None` when nothing is left.
pub fn non_empty_trimmed(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Categories are compared case-insensitively, so they are stored lowercased.
pub fn normalize_category(value: &str) -> Option<String> {
    non_empty_trimmed(value).map(|category| category.to_lowercase())
}

/// Validate an http(s) endpoint and strip any trailing slash.
pub fn normalize_endpoint(raw: &str) -> Result<String> {
    let endpoint = non_empty_trimmed(raw)
        .ok_or_else(|| Error::Config("endpoint must not be empty".to_string()))?;
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}
