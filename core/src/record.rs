//! Bidirectional mapping between local field names and remote field names.
//!
//! # Design
//! Each record type declares a static table of `(local, remote)` pairs and
//! an optional wrapper name. The free functions here do the table-driven
//! work; record types implement `Record` by exposing their set fields as a
//! local-named map and by rebuilding themselves from one.
//!
//! Falsy values (null, `false`, `0`, `""`) are omitted on the way out.
//! Remote fields with no local counterpart are kept under their remote
//! name on the way in.

use serde_json::{Map, Value};

use crate::encode;
use crate::error::ApiError;

/// `(local, remote)` field name pairs.
pub type Mapping = &'static [(&'static str, &'static str)];

/// A local domain object with a field mapping to the remote API.
pub trait Record: Sized {
    const MAPPING: Mapping;

    /// Outer key the serialized fields nest under, if any.
    const WRAPPER: Option<&'static str> = None;

    /// Currently held fields, keyed by local name.
    fn local_fields(&self) -> Map<String, Value>;

    /// Build from a remote-shaped payload, validating required fields.
    fn from_remote(payload: &Value) -> Result<Self, ApiError>;

    /// Remote-shaped tree for this record.
    fn to_remote(&self) -> Value {
        to_remote(Self::MAPPING, Self::WRAPPER, &self.local_fields())
    }

    /// Form body for a POST request.
    fn to_form_body(&self) -> String {
        encode::encode_form(&self.to_remote())
    }
}

pub fn remote_name(mapping: Mapping, local: &str) -> Option<&'static str> {
    mapping.iter().find(|(l, _)| *l == local).map(|(_, r)| *r)
}

pub fn local_name(mapping: Mapping, remote: &str) -> Option<&'static str> {
    mapping.iter().find(|(_, r)| *r == remote).map(|(l, _)| *l)
}

/// Reverse-map a remote payload into local names.
pub fn to_local(mapping: Mapping, remote: &Map<String, Value>) -> Map<String, Value> {
    remote
        .iter()
        .map(|(key, value)| {
            let name = local_name(mapping, key).map_or_else(|| key.clone(), str::to_string);
            (name, value.clone())
        })
        .collect()
}

/// Map local fields to remote names, in table order, skipping falsy ones.
pub fn to_remote(mapping: Mapping, wrapper: Option<&str>, local: &Map<String, Value>) -> Value {
    let mut fields = Map::new();
    for (local_name, remote_name) in mapping {
        if let Some(value) = local.get(*local_name).filter(|v| is_truthy(v)) {
            fields.insert((*remote_name).to_string(), value.clone());
        }
    }
    match wrapper {
        Some(name) => {
            let mut outer = Map::new();
            outer.insert(name.to_string(), Value::Object(fields));
            Value::Object(outer)
        }
        None => Value::Object(fields),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Local fields of a remote payload, or a validation error naming `what`
/// when the payload is not an object.
pub(crate) fn local_fields_of(
    mapping: Mapping,
    payload: &Value,
    what: &str,
) -> Result<Map<String, Value>, ApiError> {
    match payload {
        Value::Object(remote) => Ok(to_local(mapping, remote)),
        _ => Err(ApiError::validation(format!("{what} payload must be an object"))),
    }
}

/// Remove `name` and read it as text. Numbers and booleans are rendered.
pub(crate) fn take_string(fields: &mut Map<String, Value>, name: &str) -> Option<String> {
    fields.remove(name).and_then(|v| encode::scalar_text(&v))
}

/// Remove `name` and read it as an unsigned integer, from a number or a
/// numeric string.
pub(crate) fn take_u64(fields: &mut Map<String, Value>, name: &str) -> Result<Option<u64>, ApiError> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| ApiError::validation(format!("{name} must be a non-negative integer"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiError::validation(format!("{name} must be a non-negative integer, got {s:?}"))),
        Some(other) => Err(ApiError::validation(format!("{name} has an unexpected value {other}"))),
    }
}

/// Remove `name` and read it as a decimal.
pub(crate) fn take_f64(fields: &mut Map<String, Value>, name: &str) -> Result<Option<f64>, ApiError> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiError::validation(format!("{name} must be a number, got {s:?}"))),
        Some(other) => Err(ApiError::validation(format!("{name} has an unexpected value {other}"))),
    }
}

pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Insert `value` under `name` when present.
pub(crate) fn put(fields: &mut Map<String, Value>, name: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        fields.insert(name.to_string(), value.into());
    }
}
