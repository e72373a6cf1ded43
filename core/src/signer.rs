//! Request signing.
//!
//! Every request carries `Signature = base64(HMAC-SHA1(secret, service ||
//! operation || timestamp))`. The three parts are concatenated without a
//! separator.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::ApiError;

type HmacSha1 = Hmac<Sha1>;

/// Access key and shared secret. Both are non-blank once constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_key: String,
    secret: String,
}

impl Credential {
    pub fn new(access_key: impl Into<String>, secret: impl Into<String>) -> Result<Self, ApiError> {
        let access_key = access_key.into();
        let secret = secret.into();
        if access_key.trim().is_empty() {
            return Err(ApiError::Config("the access key is not valid".to_string()));
        }
        if secret.trim().is_empty() {
            return Err(ApiError::Config("the secret key is not valid".to_string()));
        }
        Ok(Self { access_key, secret })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Sign one request. Deterministic for identical inputs.
    pub fn sign(&self, service: &str, operation: &str, timestamp: &str) -> String {
        let mut mac = HmacSha1::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(service.as_bytes());
        mac.update(operation.as_bytes());
        mac.update(timestamp.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key", &self.access_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}
