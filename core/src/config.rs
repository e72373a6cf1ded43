//! Client configuration.

use serde::Deserialize;

use crate::error::ApiError;

pub const SANDBOX_ENDPOINT: &str = "https://mechanicalturk.sandbox.amazonaws.com";
pub const PRODUCTION_ENDPOINT: &str = "https://mechanicalturk.amazonaws.com/";
pub const DEFAULT_VERSION: &str = "2012-03-25";
pub const SERVICE_NAME: &str = "AWSMechanicalTurkRequester";

/// Endpoint, API version and credentials for a `RequesterClient`.
///
/// Deserializable so hosts can embed it in their own configuration files;
/// `endpoint` defaults to the sandbox.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub access_key: String,
    pub secret: String,
}

fn default_endpoint() -> String {
    SANDBOX_ENDPOINT.to_string()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl ClientConfig {
    pub fn sandbox(access_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            version: default_version(),
            access_key: access_key.into(),
            secret: secret.into(),
        }
    }

    pub fn production(access_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            endpoint: PRODUCTION_ENDPOINT.to_string(),
            ..Self::sandbox(access_key, secret)
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Read `MTURK_ACCESS_KEY`, `MTURK_SECRET_KEY`, `MTURK_SANDBOX`,
    /// `MTURK_ENDPOINT` and `MTURK_VERSION` from the environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| ApiError::Config(format!("{name} is not set")))
        };
        let access_key = required("MTURK_ACCESS_KEY")?;
        let secret = required("MTURK_SECRET_KEY")?;

        let sandbox = match lookup("MTURK_SANDBOX").as_deref().map(str::trim) {
            None | Some("") => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(other) => {
                return Err(ApiError::Config(format!("MTURK_SANDBOX must be true or false, got {other:?}")))
            }
        };
        let mut config = if sandbox {
            Self::sandbox(access_key, secret)
        } else {
            Self::production(access_key, secret)
        };
        if let Some(endpoint) = lookup("MTURK_ENDPOINT") {
            config = config.with_endpoint(endpoint);
        }
        if let Some(version) = lookup("MTURK_VERSION") {
            config = config.with_version(version);
        }
        Ok(config)
    }
}
