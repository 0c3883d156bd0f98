//! Helpers for loosely-typed quest JSON.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::StoreError;

/// JavaScript-style truthiness.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Render an id the way it is written in URLs: strings verbatim, everything
/// else as JSON text.
pub fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `obj[key]`, or `default` when the key is absent.
pub fn field_or(obj: &serde_json::Map<String, Value>, key: &str, default: Value) -> Value {
    obj.get(key).cloned().unwrap_or(default)
}

pub fn read_json(path: &Path) -> Result<Value, StoreError> {
    let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| StoreError::json(path, e))
}

pub fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let body = serde_json::to_string_pretty(value).map_err(|e| StoreError::json(path, e))?;
    fs::write(path, body).map_err(|e| StoreError::io(path, e))
}
