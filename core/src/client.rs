//! Stateless request builder and response validator for the requester API.
//!
//! # Design
//! `RequesterClient` holds only its read-only configuration and carries no
//! mutable state between calls. `build_request` turns an `Operation` into a
//! signed `HttpRequest`; `parse_response` validates the matching
//! `HttpResponse`. The caller (or `Requester`) executes the actual HTTP
//! round-trip between the two, so concurrent calls share nothing.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{ClientConfig, SERVICE_NAME};
use crate::encode;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::operation::Operation;
use crate::response;
use crate::signer::Credential;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
pub struct RequesterClient {
    endpoint: String,
    version: String,
    credential: Credential,
}

impl RequesterClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        if config.endpoint.trim().is_empty() {
            return Err(ApiError::Config("the endpoint is not valid".to_string()));
        }
        if config.version.trim().is_empty() {
            return Err(ApiError::Config("the API version is not valid".to_string()));
        }
        let credential = Credential::new(config.access_key, config.secret)?;
        Ok(Self {
            endpoint: config.endpoint,
            version: config.version,
            credential,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Sign and assemble the request for `op` at `timestamp`.
    pub fn build_request(&self, op: &Operation, timestamp: DateTime<Utc>) -> Result<HttpRequest, ApiError> {
        if op.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest(format!("invalid operation: {:?}", op.name)));
        }
        let timestamp = timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let signature = self.credential.sign(SERVICE_NAME, &op.name, &timestamp);

        let mut params = Map::new();
        params.insert("Service".into(), SERVICE_NAME.into());
        params.insert("Operation".into(), op.name.clone().into());
        params.insert("AWSAccessKeyId".into(), self.credential.access_key().into());
        params.insert("Version".into(), self.version.clone().into());
        params.insert("Signature".into(), signature.into());
        params.insert("Timestamp".into(), timestamp.into());
        params.extend(op.params.clone());

        let mut headers = Vec::new();
        let mut body = None;
        match (op.method, &op.body) {
            (HttpMethod::Post, Some(tree)) => {
                body = Some(encode::encode_form(tree));
                headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
            }
            (HttpMethod::Get, Some(Value::Object(fields))) => {
                for (name, value) in fields {
                    if !params.contains_key(name) {
                        params.insert(name.clone(), value.clone());
                    }
                }
            }
            (HttpMethod::Get, Some(_)) => {
                return Err(ApiError::InvalidRequest(format!(
                    "{}: the data payload is not a record",
                    op.name
                )))
            }
            (_, None) => {}
        }

        let query = encode::expand_params(&params);
        debug!(
            operation = %op.name,
            method = %op.method,
            params = query.len(),
            "invoking operation"
        );
        Ok(HttpRequest {
            method: op.method,
            url: self.endpoint.clone(),
            query,
            headers,
            body,
        })
    }

    /// Validate the response to `op` and return the unwrapped payload.
    pub fn parse_response(&self, op: &Operation, response: HttpResponse) -> Result<Map<String, Value>, ApiError> {
        match response::validate(&response.body, &op.name) {
            Err(ApiError::MalformedResponse(_)) if !response.is_success() => Err(ApiError::HttpStatus {
                status: response.status,
                body: response.body,
            }),
            result => result,
        }
    }
}
