//! Per-call operation descriptors.

use serde_json::{Map, Value};

use crate::http::HttpMethod;
use crate::record::Record;

/// Operation-specific query parameters, in insertion order.
pub type Params = Map<String, Value>;

/// Method, operation name, parameters and optional body of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub method: HttpMethod,
    pub name: String,
    pub params: Params,
    /// Remote-shaped tree of the record sent with the call.
    pub body: Option<Value>,
}

impl Operation {
    pub fn new(method: HttpMethod, name: impl Into<String>) -> Self {
        Self {
            method,
            name: name.into(),
            params: Params::new(),
            body: None,
        }
    }

    pub fn get(name: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, name)
    }

    pub fn post(name: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, name)
    }

    /// Set a parameter, replacing any earlier value. `None` is skipped.
    pub fn param(mut self, name: &str, value: impl Into<Option<Value>>) -> Self {
        if let Some(value) = value.into() {
            self.params.insert(name.to_string(), value);
        }
        self
    }

    /// Merge caller parameters; they replace values already set.
    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn body(mut self, record: &impl Record) -> Self {
        self.body = Some(record.to_remote());
        self
    }
}
