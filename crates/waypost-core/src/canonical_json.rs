//! Canonical JSON serialization for deterministic hashing.
//!
//! Binding fingerprints must be stable across key order and whitespace,
//! so values are encoded with object keys sorted lexicographically and no
//! whitespace before hashing.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Serializes `value` into canonical JSON: keys sorted, no whitespace,
/// UTF-8 output.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the value cannot be converted to
/// JSON.
pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String> {
    let v = serde_json::to_value(value).map_err(serialization_error)?;
    let mut out = String::new();
    write_value(&v, &mut out)?;
    Ok(out)
}

fn serialization_error(err: serde_json::Error) -> Error {
    Error::Serialization {
        message: err.to_string(),
    }
}

fn write_value(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // BTreeMap iteration gives lexicographic key order.
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (key, item)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out)?;
                out.push(':');
                write_value(item, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_string(s: &str, out: &mut String) -> Result<()> {
    // serde_json applies the JSON string escaping rules.
    let escaped = serde_json::to_string(s).map_err(serialization_error)?;
    out.push_str(&escaped);
    Ok(())
}
