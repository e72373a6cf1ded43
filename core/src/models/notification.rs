//! Event notification subscriptions.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::record::{self, Mapping, Record};

/// Notification format version understood by the service.
pub const NOTIFICATION_VERSION: &str = "2006-05-05";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTransport {
    Email,
    Soap,
    Sqs,
    Rest,
}

impl NotificationTransport {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationTransport::Email => "Email",
            NotificationTransport::Soap => "SOAP",
            NotificationTransport::Sqs => "SQS",
            NotificationTransport::Rest => "REST",
        }
    }
}

impl FromStr for NotificationTransport {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Email" => Ok(NotificationTransport::Email),
            "SOAP" => Ok(NotificationTransport::Soap),
            "SQS" => Ok(NotificationTransport::Sqs),
            "REST" => Ok(NotificationTransport::Rest),
            other => Err(ApiError::validation(format!("invalid or missing transport {other:?}"))),
        }
    }
}

impl fmt::Display for NotificationTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    AssignmentAccepted,
    AssignmentAbandoned,
    AssignmentReturned,
    AssignmentSubmitted,
    HitReviewable,
    HitExpired,
    Ping,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::AssignmentAccepted,
        EventType::AssignmentAbandoned,
        EventType::AssignmentReturned,
        EventType::AssignmentSubmitted,
        EventType::HitReviewable,
        EventType::HitExpired,
        EventType::Ping,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::AssignmentAccepted => "AssignmentAccepted",
            EventType::AssignmentAbandoned => "AssignmentAbandoned",
            EventType::AssignmentReturned => "AssignmentReturned",
            EventType::AssignmentSubmitted => "AssignmentSubmitted",
            EventType::HitReviewable => "HITReviewable",
            EventType::HitExpired => "HITExpired",
            EventType::Ping => "Ping",
        }
    }
}

impl FromStr for EventType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| ApiError::validation(format!("invalid event type {s:?}")))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to deliver events of a HIT type.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub destination: String,
    pub transport: NotificationTransport,
    pub events: Vec<EventType>,
    pub version: String,
    pub active: bool,
    pub extra: Map<String, Value>,
}

impl Notification {
    pub fn new(
        destination: impl Into<String>,
        transport: NotificationTransport,
        events: Vec<EventType>,
    ) -> Result<Self, ApiError> {
        let notification = Self {
            destination: destination.into(),
            transport,
            events,
            version: NOTIFICATION_VERSION.to_string(),
            active: true,
            extra: Map::new(),
        };
        notification.validate()?;
        Ok(notification)
    }

    /// Build from untyped names, rejecting anything outside the allowed sets.
    pub fn parse(destination: &str, transport: &str, events: &[&str]) -> Result<Self, ApiError> {
        let events = events
            .iter()
            .map(|e| e.parse())
            .collect::<Result<Vec<EventType>, _>>()?;
        Self::new(destination, transport.parse()?, events)
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.destination.trim().is_empty() {
            return Err(ApiError::validation("invalid or missing destination"));
        }
        if self.events.is_empty() {
            return Err(ApiError::validation("invalid or missing events"));
        }
        Ok(())
    }
}

impl Record for Notification {
    const MAPPING: Mapping = &[
        ("destination", "Destination"),
        ("transport", "Transport"),
        ("events", "EventType"),
        ("version", "Version"),
        ("active", "Active"),
    ];

    const WRAPPER: Option<&'static str> = Some("Notification");

    fn local_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("destination".into(), Value::from(self.destination.as_str()));
        fields.insert("transport".into(), Value::from(self.transport.as_str()));
        fields.insert(
            "events".into(),
            Value::Array(self.events.iter().map(|e| Value::from(e.as_str())).collect()),
        );
        fields.insert("version".into(), Value::from(self.version.as_str()));
        fields.insert("active".into(), Value::Bool(self.active));
        fields
    }

    /// Emitted as a one-element list under the wrapper so the block is
    /// numbered `Notification.1.*`. `Active` is always sent, even when false.
    fn to_remote(&self) -> Value {
        let mut block = record::to_remote(Self::MAPPING, None, &self.local_fields());
        if let Value::Object(fields) = &mut block {
            fields.insert("Active".into(), Value::Bool(self.active));
        }
        let mut outer = Map::new();
        outer.insert(
            Self::WRAPPER.unwrap_or("Notification").to_string(),
            Value::Array(vec![block]),
        );
        Value::Object(outer)
    }

    fn from_remote(payload: &Value) -> Result<Self, ApiError> {
        let inner = match payload.get("Notification") {
            Some(Value::Array(items)) => items
                .first()
                .ok_or_else(|| ApiError::validation("empty notification list"))?,
            Some(inner) => inner,
            None => payload,
        };
        let mut fields = record::local_fields_of(Self::MAPPING, inner, "notification")?;
        let destination = record::take_string(&mut fields, "destination").unwrap_or_default();
        let transport = record::take_string(&mut fields, "transport")
            .unwrap_or_default()
            .parse()?;
        let events = match fields.remove("events") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|e| e.as_str().unwrap_or_default().parse())
                .collect::<Result<Vec<EventType>, _>>()?,
            Some(Value::String(event)) => vec![event.parse()?],
            _ => Vec::new(),
        };
        let version = record::take_string(&mut fields, "version")
            .unwrap_or_else(|| NOTIFICATION_VERSION.to_string());
        let active = match fields.remove("active") {
            Some(Value::Bool(active)) => active,
            Some(Value::String(s)) => !s.trim().eq_ignore_ascii_case("false"),
            _ => true,
        };
        let notification = Self {
            destination,
            transport,
            events,
            version,
            active,
            extra: fields,
        };
        notification.validate()?;
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification() -> Notification {
        Notification::new(
            "https://example.com/hook",
            NotificationTransport::Rest,
            vec![EventType::AssignmentSubmitted, EventType::HitExpired],
        )
        .unwrap()
    }

    #[test]
    fn serializes_as_first_numbered_block() {
        assert_eq!(
            notification().to_form_body(),
            "Notification.1.Destination=https://example.com/hook&Notification.1.Transport=REST\
             &Notification.1.EventType.1=AssignmentSubmitted&Notification.1.EventType.2=HITExpired\
             &Notification.1.Version=2006-05-05&Notification.1.Active=true"
        );
    }

    #[test]
    fn inactive_subscription_still_sends_active() {
        let tree = notification().with_active(false).to_remote();
        assert_eq!(tree["Notification"][0]["Active"], json!(false));
    }

    #[test]
    fn rejects_values_outside_allowed_sets() {
        assert!(Notification::parse("a@example.com", "Email", &["Ping"]).is_ok());
        assert!(matches!(
            Notification::parse("a@example.com", "Pigeon", &["Ping"]),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            Notification::parse("a@example.com", "Email", &["Ping", "HITDeleted"]),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            Notification::parse("a@example.com", "Email", &[]),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            Notification::parse("  ", "Email", &["Ping"]),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn remote_round_trip() {
        let original = notification().with_active(false);
        assert_eq!(Notification::from_remote(&original.to_remote()).unwrap(), original);
    }

    #[test]
    fn parses_single_event_payload() {
        let notification = Notification::from_remote(&json!({
            "Destination": "a@example.com",
            "Transport": "Email",
            "EventType": "Ping",
            "Active": "True"
        }))
        .unwrap();
        assert_eq!(notification.events, vec![EventType::Ping]);
        assert!(notification.active);
        assert_eq!(notification.version, NOTIFICATION_VERSION);
    }
}
