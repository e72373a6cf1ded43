//! Error types for the requester client.
//!
//! # Design
//! Service-reported failures get a dedicated variant carrying the ordered
//! `{code, message}` list because callers frequently branch on the remote
//! reason ("the HIT does not exist") rather than on client or transport
//! problems. Every other failure kind maps to exactly one variant.

use std::fmt;

/// A single error entry reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub code: String,
    pub message: String,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Ordered list of service errors collected from one response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceErrors(pub Vec<ServiceError>);

impl ServiceErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ServiceError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `"{code}: {message}"` rendering of every entry, in order.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// True when any entry carries `code`.
    pub fn contains_code(&self, code: &str) -> bool {
        self.0.iter().any(|e| e.code == code)
    }
}

impl fmt::Display for ServiceErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

/// Errors returned by the requester client and its records.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid client configuration, e.g. a blank access key or secret.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A record was constructed with missing or invalid fields.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation descriptor cannot be turned into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The network round-trip itself failed.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server returned a non-2xx status and no protocol document.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body could not be parsed or lacks the expected envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The service rejected the request with one or more errors.
    #[error("service reported errors: {0}")]
    Service(ServiceErrors),

    /// Neither errors nor a Request node were found in the response.
    #[error("cannot find a Request node, unable to check if the response is valid")]
    Unverifiable,

    /// The operation exists remotely but this client does not support it.
    #[error("operation {0} is not implemented")]
    NotImplemented(&'static str),
}

impl ApiError {
    /// The service error list, when this is a service-reported failure.
    pub fn service_errors(&self) -> Option<&ServiceErrors> {
        match self {
            ApiError::Service(errors) => Some(errors),
            _ => None,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ApiError::MalformedResponse(msg.into())
    }
}
