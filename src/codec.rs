//! Entity <-> document conversion.
//!
//! Entities are encoded as JSON trees. Files are compared as trees, never as
//! text, so key order, whitespace and number spelling do not matter.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::Result;

/// Order-insensitive key/value tree for one entity.
pub type Document = Value;

pub fn encode<T: Serialize>(entity: &T) -> Result<Document> {
    Ok(serde_json::to_value(entity)?)
}

/// Unknown keys are ignored so files written by newer builds still load.
pub fn decode<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(serde_json::from_value(doc)?)
}

/// Pretty-printed file content for an entity.
pub fn to_text<T: Serialize>(entity: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(entity)?;
    text.push('\n');
    Ok(text)
}

pub fn from_text<T: DeserializeOwned>(text: &str) -> Result<T> {
    decode(parse_document(text)?)
}

pub fn parse_document(text: &str) -> Result<Document> {
    Ok(serde_json::from_str(text)?)
}

/// Structural equality.
///
/// Objects match regardless of key order, and a key holding `null` matches
/// a missing key. Numbers match by value, so `1`, `1.0` and `1e0` are equal.
pub fn tree_eq(a: &Document, b: &Document) -> bool {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => left
            .keys()
            .chain(right.keys())
            .all(|key| {
                tree_eq(
                    left.get(key).unwrap_or(&Value::Null),
                    right.get(key).unwrap_or(&Value::Null),
                )
            }),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| tree_eq(l, r))
        }
        (Value::Number(left), Value::Number(right)) => {
            left == right
                || match (left.as_f64(), right.as_f64()) {
                    (Some(l), Some(r)) => l == r,
                    _ => false,
                }
        }
        _ => a == b,
    }
}
