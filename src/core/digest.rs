//! Payload digests for reconciliation
//!
//! A local record stores the SHA-256 of the document it submitted, computed
//! over canonical JSON (object keys sorted, no whitespace), so it can be
//! matched against the server's copy later.

use crate::domain::Result;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hex-encoded SHA-256 of the canonical form of `document`
///
/// # Examples
///
/// ```
/// use claimwright::core::digest::payload_digest;
/// use serde_json::json;
///
/// let a = payload_digest(&json!({"b": 1, "a": [true, null]})).unwrap();
/// let b = payload_digest(&json!({"a": [true, null], "b": 1})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn payload_digest(document: &Value) -> Result<String> {
    let canonical = serde_json::to_string(&canonicalize(document))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        _ => value.clone(),
    }
}
