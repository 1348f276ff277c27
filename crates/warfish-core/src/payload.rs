//! Readers for raw Warfish JSON payloads.
//!
//! Every section the server returns is wrapped in `{"_content": ...}`
//! envelopes, and the encoding is loose about types:
//! - counts and ids arrive as either JSON numbers or numeric strings
//! - hidden values (fog) arrive as `"?"`
//! - a list holding a single element may arrive as a bare object
//!
//! The helpers here normalize all of that and report *which* field was
//! missing or malformed. Callers decide whether that is a setup failure or a
//! protocol failure.

use serde_json::Value;
use thiserror::Error;

/// Marker the server uses for values hidden from this player.
pub const HIDDEN: &str = "?";

/// A payload did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("missing field `{0}`")]
    Missing(String),

    #[error("field `{field}` is not a valid number: {value}")]
    NotANumber { field: String, value: String },

    #[error("field `{0}` has an unexpected type")]
    WrongType(String),
}

/// Look up `key` in an object.
pub fn get<'a>(value: &'a Value, key: &str) -> Result<&'a Value, PayloadError> {
    value
        .get(key)
        .ok_or_else(|| PayloadError::Missing(key.to_string()))
}

/// Walk a chain of object keys, reporting the full dotted path on failure.
pub fn path<'a>(value: &'a Value, keys: &[&str]) -> Result<&'a Value, PayloadError> {
    let mut current = value;
    for (depth, key) in keys.iter().enumerate() {
        current = current
            .get(*key)
            .ok_or_else(|| PayloadError::Missing(keys[..=depth].join(".")))?;
    }
    Ok(current)
}

/// Read `root._content.<section>._content.<list>`, the layout used by every
/// section of `getDetails` and `getState`.
pub fn section<'a>(root: &'a Value, section: &str, list: &str) -> Result<&'a Value, PayloadError> {
    path(root, &["_content", section, "_content", list])
}

/// Elements of a list field. A bare object counts as a one-element list and
/// `null` as an empty one.
pub fn items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(list) => list.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Read a non-negative count or id.
pub fn as_u32(value: &Value, field: &str) -> Result<u32, PayloadError> {
    let not_a_number = || PayloadError::NotANumber {
        field: field.to_string(),
        value: value.to_string(),
    };
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(not_a_number),
        Value::String(s) => s.trim().parse().map_err(|_| not_a_number()),
        _ => Err(not_a_number()),
    }
}

/// Read a signed integer (player ids use `-1` for "nobody").
pub fn as_i64(value: &Value, field: &str) -> Result<i64, PayloadError> {
    let not_a_number = || PayloadError::NotANumber {
        field: field.to_string(),
        value: value.to_string(),
    };
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(not_a_number),
        Value::String(s) => s.trim().parse().map_err(|_| not_a_number()),
        _ => Err(not_a_number()),
    }
}

/// Read a count that may be hidden. `"?"` yields `None`.
pub fn as_hidden_u32(value: &Value, field: &str) -> Result<Option<u32>, PayloadError> {
    match value {
        Value::String(s) if s.trim() == HIDDEN => Ok(None),
        other => as_u32(other, field).map(Some),
    }
}

/// Read a text field. Numbers are accepted and rendered as text.
pub fn as_text(value: &Value, field: &str) -> Result<String, PayloadError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(PayloadError::WrongType(field.to_string())),
    }
}

/// Read a server flag. Anything other than `0`, `"0"`, `false`, `""` or
/// `null` is set.
pub fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !matches!(s.trim(), "" | "0"),
        Value::Null => false,
        _ => true,
    }
}

/// Read an optional flag; a missing key is unset.
pub fn opt_flag(value: &Value, key: &str) -> bool {
    value.get(key).map(as_flag).unwrap_or(false)
}

/// Parse a comma separated id list such as `"1,4,7"`.
pub fn id_list(value: &Value, field: &str) -> Result<Vec<u32>, PayloadError> {
    let text = as_text(value, field)?;
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse().map_err(|_| PayloadError::NotANumber {
                field: field.to_string(),
                value: part.to_string(),
            })
        })
        .collect()
}
