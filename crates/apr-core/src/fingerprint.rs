// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical JSON serialization and content hashing.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render `value` as canonical JSON: object keys sorted recursively, no
/// insignificant whitespace. Used so two structurally-equal packets hash
/// identically regardless of field order.
#[must_use]
pub fn canonical_json<T: Serialize>(value: &T) -> String {
    let v = serde_json::to_value(value).expect("payload types are always representable as JSON");
    canonicalize(&v).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> =
                map.iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Lowercase hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content fingerprint of any serializable value: the SHA-256 hex digest
/// of its canonical JSON form.
#[must_use]
pub fn fingerprint<T: Serialize>(value: &T) -> String {
    sha256_hex(canonical_json(value).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn fingerprint_is_stable_under_key_order() {
        let a = json!({"x": {"z": 1, "y": 2}, "w": [1, 2, 3]});
        let b = json!({"w": [1, 2, 3], "x": {"y": 2, "z": 1}});
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_differs_on_value_change() {
        let a = json!({"x": 1});
        let b = json!({"x": 2});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn sha256_hex_matches_known_vector() {
        // SHA-256("") per FIPS 180-4 test vectors.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
