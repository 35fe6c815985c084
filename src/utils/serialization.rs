// src/utils/serialization.rs
//! JSON helpers shared by the issuance store and the proof-stream parser.
//!
//! `serde_json` is built with `preserve_order`, so a `Value` re-serialized by
//! [`serialize`] keeps the field order it was parsed with. Self-addressing
//! identifiers depend on that.

use serde::{de::DeserializeOwned, Serialize};
use serde_json;

/// Serializes a value to a compact JSON string.
///
/// # Returns
/// - `Ok(String)` with JSON representation on success
/// - `Err(serde_json::Error)` if serialization fails
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Serializes a value to pretty-printed JSON, for files operators may read.
pub fn serialize_pretty<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Deserializes an owned value from a JSON string.
pub fn deserialize<T: DeserializeOwned>(data: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}
