//! Response validation.
//!
//! # Design
//! A response document is rooted at `{Operation}Response` (or `Response`)
//! and carries a `Request` node with an `IsValid` flag, either directly or
//! inside one of the root's children (usually `{Operation}Result` or the
//! returned entity). Errors can appear on the root itself or, for invalid
//! requests, on the `Request` node. Any error fails the whole call. A
//! response with no `Request` node and no errors cannot be trusted and is
//! rejected as well.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ApiError, ServiceError, ServiceErrors};
use crate::xml;

/// Parse and validate `body` for `operation`, returning the unwrapped
/// payload with `OperationRequest` and `Request` removed.
pub fn validate(body: &str, operation: &str) -> Result<Map<String, Value>, ApiError> {
    let tree = xml::parse(body)?;
    validate_tree(tree, operation)
}

/// Validate an already parsed document.
pub fn validate_tree(tree: Value, operation: &str) -> Result<Map<String, Value>, ApiError> {
    let Value::Object(mut doc) = tree else {
        return Err(ApiError::malformed("response is not a document"));
    };
    let root = doc
        .remove(&format!("{operation}Response"))
        .or_else(|| doc.remove("Response"))
        .ok_or_else(|| ApiError::malformed(format!("missing {operation}Response root")))?;
    let Value::Object(mut response) = root else {
        return Err(ApiError::malformed(format!("{operation}Response has no content")));
    };

    let request = locate_request(&response);
    let mut errors = Vec::new();
    if let Some(generic) = response.get("Errors") {
        errors.extend(error_entries(generic));
    }
    if let Some(request) = request.filter(|r| is_marked_invalid(r)) {
        let before = errors.len();
        if let Some(nested) = request.get("Errors") {
            errors.extend(error_entries(nested));
        }
        if errors.len() == before {
            errors.push(ServiceError {
                code: "InvalidRequest".to_string(),
                message: "the request was marked invalid without error details".to_string(),
            });
        }
    }

    if !errors.is_empty() {
        let errors = ServiceErrors(errors);
        warn!(operation, %errors, "service rejected request");
        return Err(ApiError::Service(errors));
    }
    if request.is_none() {
        return Err(ApiError::Unverifiable);
    }

    let mut payload = match response.remove(&format!("{operation}Result")) {
        Some(Value::Object(result)) => result,
        Some(other) => {
            response.insert(format!("{operation}Result"), other);
            response
        }
        None => response,
    };
    payload.shift_remove("OperationRequest");
    payload.shift_remove("Request");
    debug!(operation, fields = payload.len(), "response validated");
    Ok(payload)
}

/// The `Request` node, directly under the root or under the first child
/// that carries one.
fn locate_request(response: &Map<String, Value>) -> Option<&Map<String, Value>> {
    if let Some(Value::Object(request)) = response.get("Request") {
        return Some(request);
    }
    response.values().find_map(|node| match node.get("Request") {
        Some(Value::Object(request)) => Some(request),
        _ => None,
    })
}

fn is_marked_invalid(request: &Map<String, Value>) -> bool {
    request
        .get("IsValid")
        .and_then(Value::as_str)
        .is_some_and(|flag| flag.trim().eq_ignore_ascii_case("false"))
}

/// Entries of an `Errors` node; `Error` may be one element or several.
fn error_entries(errors: &Value) -> Vec<ServiceError> {
    match errors.get("Error") {
        Some(Value::Array(items)) => items.iter().map(error_entry).collect(),
        Some(item) => vec![error_entry(item)],
        None => Vec::new(),
    }
}

fn error_entry(node: &Value) -> ServiceError {
    let text = |name: &str| match node.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    ServiceError {
        code: text("Code"),
        message: text("Message"),
    }
}

/// Coerce a field that may hold one item or many into a list.
pub fn as_list(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(item) => vec![item],
    }
}

/// Read a pagination counter. Absent or unparsable counters are malformed.
pub fn counter(payload: &Map<String, Value>, name: &str) -> Result<u32, ApiError> {
    let raw = match payload.get(name) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(ApiError::malformed(format!("missing {name}"))),
    };
    raw.parse()
        .map_err(|_| ApiError::malformed(format!("{name} is not an integer: {raw:?}")))
}
