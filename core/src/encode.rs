//! Wire encoding for request bodies and query parameters.
//!
//! # Design
//! The service expects nested structures flattened into dotted, 1-based
//! indexed names: an array of scalars `A = [x, y]` becomes `A.1=x&A.2=y`,
//! and a block nested under a top-level name becomes `Reward.1.Amount=..`.
//! Only the top-level block is numbered; fields nested deeper keep the
//! prefix of their top-level block and are not renumbered.
//!
//! Values in POST bodies are escaped with URI (not URI component) rules, so
//! characters that are legal in a URI path stay literal.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{Map, Value};

/// Characters escaped by URI encoding. Everything else in ASCII, including
/// `;,/?:@&=+$#`, is left as is.
const URI: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

pub fn encode_uri(value: &str) -> String {
    utf8_percent_encode(value, URI).to_string()
}

/// Encode a record tree as a form body: `name=value` pairs joined by `&`,
/// in insertion order.
pub fn encode_form(tree: &Value) -> String {
    flatten(tree)
        .into_iter()
        .map(|(name, value)| format!("{name}={}", encode_uri(&value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Flatten a tree into unescaped `(name, value)` pairs.
pub fn flatten(tree: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    walk(tree, None, "", &mut pairs);
    pairs
}

/// Expand a parameter mapping into query pairs. Scalars pass through,
/// arrays become `name.1, name.2, ..` and nulls are dropped.
///
/// Object values go further than plain top-level array expansion: they are
/// flattened with the same block numbering as form bodies
/// (`Reward.1.Amount`), so a record passed as a GET parameter still reaches
/// the service in a shape it accepts.
pub fn expand_params(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (name, value) in params {
        walk(value, Some(name), "", &mut pairs);
    }
    pairs
}

fn walk(node: &Value, name: Option<&str>, path: &str, out: &mut Vec<(String, String)>) {
    if let Some(text) = scalar_text(node) {
        if let Some(name) = name {
            out.push((format!("{path}{name}"), text));
        }
        return;
    }
    match node {
        Value::Array(items) if items.iter().all(is_scalar) => {
            let Some(name) = name else { return };
            for (i, item) in items.iter().enumerate() {
                if let Some(text) = scalar_text(item) {
                    out.push((format!("{path}{name}.{}", i + 1), text));
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                match (name, scalar_text(item)) {
                    (Some(name), Some(text)) => out.push((format!("{path}{name}.{}", i + 1), text)),
                    (_, Some(_)) => {}
                    (_, None) => walk(item, None, &block_prefix(name, path, i + 1), out),
                }
            }
        }
        Value::Object(fields) => {
            let prefix = block_prefix(name, path, 1);
            for (key, child) in fields {
                walk(child, Some(key), &prefix, out);
            }
        }
        _ => {}
    }
}

/// A named block directly under the document root is numbered; anything
/// deeper inherits its parent's prefix.
fn block_prefix(name: Option<&str>, path: &str, index: usize) -> String {
    match name {
        Some(name) if path.is_empty() => format!("{name}.{index}."),
        _ => path.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Wire text for a scalar. Integral floats print without a fraction.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() && f.is_finite() && f.fract() == 0.0 => {
                Some(format!("{f:.0}"))
            }
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}
