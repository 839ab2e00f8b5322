//! Request DTOs for the gateway API
//!
//! Defines the structure of incoming HTTP request bodies and path checks.

use serde::Deserialize;

/// Maximum length of a `kind` or `id` path segment in bytes
pub const MAX_SEGMENT_LENGTH: usize = 64;

/// Request body for writing a record (PUT /records/:kind/:id)
#[derive(Debug, Clone, Deserialize)]
pub struct PutRecordRequest {
    /// Arbitrary JSON stored as the record payload
    pub payload: serde_json::Value,
}

impl PutRecordRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.payload.is_null() {
            return Some("Payload cannot be null".to_string());
        }
        None
    }
}

/// Checks a `kind` or `id` path segment.
///
/// Segments become part of the cache key, so they are restricted to
/// `[A-Za-z0-9_-]` to keep the `kind:id` namespace unambiguous.
pub fn validate_segment(name: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        return Some(format!("{name} cannot be empty"));
    }
    if value.len() > MAX_SEGMENT_LENGTH {
        return Some(format!(
            "{name} exceeds maximum length of {MAX_SEGMENT_LENGTH} characters"
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Some(format!(
            "{name} may only contain letters, digits, '_' and '-'"
        ));
    }
    None
}
