//! Payment amounts.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::record::{self, Mapping, Record};

pub const DEFAULT_CURRENCY: &str = "USD";

/// A price in a currency, serialized as `{Amount, CurrencyCode}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    pub price: f64,
    pub currency: String,
    /// Remote fields without a local counterpart, e.g. `FormattedPrice`.
    pub extra: Map<String, Value>,
}

impl Reward {
    /// A reward in US dollars.
    pub fn new(price: f64) -> Result<Self, ApiError> {
        Self::with_currency(price, DEFAULT_CURRENCY)
    }

    pub fn with_currency(price: f64, currency: impl Into<String>) -> Result<Self, ApiError> {
        let reward = Self {
            price,
            currency: currency.into(),
            extra: Map::new(),
        };
        reward.validate()?;
        Ok(reward)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(ApiError::validation(format!("invalid reward amount {}", self.price)));
        }
        if self.currency.trim().is_empty() {
            return Err(ApiError::validation("invalid or missing currency"));
        }
        Ok(())
    }
}

impl Record for Reward {
    const MAPPING: Mapping = &[("price", "Amount"), ("currency", "CurrencyCode")];

    fn local_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("price".into(), Value::from(self.price));
        fields.insert("currency".into(), Value::from(self.currency.as_str()));
        fields
    }

    fn from_remote(payload: &Value) -> Result<Self, ApiError> {
        let mut fields = record::local_fields_of(Self::MAPPING, payload, "reward")?;
        let price = record::take_f64(&mut fields, "price")?
            .ok_or_else(|| ApiError::validation("invalid or missing reward amount"))?;
        let currency = record::take_string(&mut fields, "currency")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let reward = Self {
            price,
            currency,
            extra: fields,
        };
        reward.validate()?;
        Ok(reward)
    }
}
