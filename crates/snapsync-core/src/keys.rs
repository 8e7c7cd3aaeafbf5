//! Required-field lookup for parsed API responses.

use crate::error::{KnownError, Result};
use serde_json::Value;

/// Look up `key` in `container`, failing with a protocol error if it is absent.
///
/// `container_name` names the container in the error message; without it the
/// message is just the key. A container that is not a JSON object has no keys.
///
/// # Errors
/// Returns `KnownError::Protocol` carrying a copy of `container` when `key`
/// is missing.
pub fn ensure_key<'a>(
    key: &str,
    container: &'a Value,
    container_name: Option<&str>,
) -> Result<&'a Value> {
    container.get(key).ok_or_else(|| {
        KnownError::protocol(key, container_name).with_debug_object(container.clone())
    })
}

/// Look up a required string field.
///
/// A value of any other type counts as a missing string, so both cases give
/// the same protocol error with `container` attached.
///
/// # Errors
/// Returns `KnownError::Protocol` if the key is missing or its value is not a string.
pub fn ensure_str<'a>(
    key: &str,
    container: &'a Value,
    container_name: Option<&str>,
) -> Result<&'a str> {
    ensure_key(key, container, container_name)?
        .as_str()
        .ok_or_else(|| {
            KnownError::protocol(key, container_name).with_debug_object(container.clone())
        })
}
