//! # Canonical Encoding
//!
//! Deterministic byte encoding that signatures are computed over.
//!
//! The encoding is compact JSON. Top-level fields appear in a fixed,
//! per-kind order; keys that are absent, `null`, or empty arrays are
//! omitted, and `signature` is never included. Nested objects are written
//! with their keys sorted so that two peers always produce identical bytes
//! for logically identical events.

use serde::Serialize;
use serde_json::Value;

use crate::errors::CanonicalError;

/// Types with a canonical encoding.
pub trait Canonical: Serialize {
    /// Serialized top-level field names, in canonical order.
    const FIELD_ORDER: &'static [&'static str];

    /// Canonical bytes of this value.
    fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        canonicalize(self, Self::FIELD_ORDER)
    }
}

/// Canonicalize any serializable value using the given field order.
pub fn canonicalize<T: Serialize + ?Sized>(
    value: &T,
    field_order: &[&str],
) -> Result<Vec<u8>, CanonicalError> {
    let value = serde_json::to_value(value)?;
    canonicalize_value(&value, field_order)
}

/// Canonicalize an already-parsed JSON object.
///
/// Used on inbound events so the verifier encodes exactly what arrived,
/// including fields this node does not model.
pub fn canonicalize_value(value: &Value, field_order: &[&str]) -> Result<Vec<u8>, CanonicalError> {
    let object = value.as_object().ok_or(CanonicalError::NotAnObject)?;

    let mut out = Vec::with_capacity(256);
    out.push(b'{');
    let mut first = true;
    for key in field_order {
        let Some(field) = object.get(*key) else {
            continue;
        };
        if is_omitted(field) {
            continue;
        }
        if !first {
            out.push(b',');
        }
        first = false;
        write_string(&mut out, key)?;
        out.push(b':');
        write_value(&mut out, field)?;
    }
    out.push(b'}');
    Ok(out)
}

fn is_omitted(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<(), CanonicalError> {
    serde_json::to_writer(&mut *out, s)?;
    Ok(())
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<(), CanonicalError> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(out, key)?;
                out.push(b':');
                write_value(out, &map[key.as_str()])?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}
