//! Canonical JSON serialization
//!
//! Deterministically renders a structured value into a byte string so
//! that hashing it is reproducible across processes, runs and
//! implementations. The rules are deliberately small:
//!
//! - primitives use serde_json's locale-independent encoding
//! - arrays keep their element order
//! - object keys are sorted byte-wise ascending, regardless of
//!   insertion order
//!
//! Any divergence here (number formatting, key order) silently breaks
//! every stored sealing digest, so this module is pure and has no
//! dependencies beyond serde_json.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Canonicalization error
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// The value cannot be represented as plain data (e.g. a map with
    /// non-string keys)
    #[error("Value has no canonical form: {0}")]
    UnsupportedType(String),
}

impl From<CanonicalError> for shared::AppError {
    fn from(err: CanonicalError) -> Self {
        shared::AppError::with_message(shared::ErrorCode::UnsupportedType, err.to_string())
    }
}

/// Render a JSON value in canonical form.
///
/// Identical logical input produces byte-identical output, independent
/// of object key insertion order.
pub fn canonicalize(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => value.to_string(),
        // serde_json applies JSON string escaping rules
        Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            // 按键字节序升序排序，抹掉插入顺序
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    let key = Value::String(k.clone()).to_string();
                    format!("{}:{}", key, canonicalize(&map[k]))
                })
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// Serialize any value to its canonical JSON byte string.
///
/// Fails with [`CanonicalError::UnsupportedType`] when serde cannot
/// represent the value as plain data.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let value =
        serde_json::to_value(value).map_err(|e| CanonicalError::UnsupportedType(e.to_string()))?;
    Ok(canonicalize(&value))
}
