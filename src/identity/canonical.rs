//! Canonical JSON encoding and digests used for content-addressed identities.
//! Object keys are emitted in sorted order at every depth; arrays keep their order.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex encoded SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Serializes a JSON value with recursively sorted object keys.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Converts any serializable value to its canonical JSON text.
pub fn to_canonical_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(canonical_json(&value))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(key) {
                    write_canonical(inner, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sha256_hex_known_digest() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let value = json!({
            "z": { "y": [ { "b": true, "a": null } ], "x": "s" },
            "a": 1.5
        });
        assert_eq!(
            canonical_json(&value),
            r#"{"a":1.5,"z":{"x":"s","y":[{"a":null,"b":true}]}}"#
        );
    }

    #[test]
    fn test_strings_are_escaped() {
        let value = json!({ "k\"ey": "line\nbreak" });
        assert_eq!(canonical_json(&value), r#"{"k\"ey":"line\nbreak"}"#);
    }
}
