//! HIT types: the shared title, reward and duration of a group of HITs.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::models::{Notification, Reward};
use crate::record::{self, Mapping, Record};
use crate::requester::Requester;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub struct HitType {
    /// Assigned by the service on registration.
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub reward: Reward,
    /// Seconds a worker has to complete an assignment.
    pub duration: u64,
    pub keywords: Option<String>,
    pub extra: Map<String, Value>,
}

impl HitType {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        reward: Reward,
        duration: u64,
    ) -> Result<Self, ApiError> {
        let hit_type = Self {
            id: None,
            title: title.into(),
            description: description.into(),
            reward,
            duration,
            keywords: None,
            extra: Map::new(),
        };
        hit_type.validate()?;
        Ok(hit_type)
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::validation("invalid or missing title"));
        }
        if self.description.trim().is_empty() {
            return Err(ApiError::validation("invalid or missing description"));
        }
        self.reward.validate()?;
        if self.duration == 0 {
            return Err(ApiError::validation("invalid or missing duration"));
        }
        Ok(())
    }

    /// Register with the service and record the assigned id.
    pub fn register<T: Transport>(&mut self, requester: &Requester<T>) -> Result<&str, ApiError> {
        let id = requester.register_hit_type(self)?;
        Ok(self.id.insert(id).as_str())
    }

    /// Subscribe `notification` to events of this HIT type.
    pub fn set_notification<T: Transport>(
        &self,
        requester: &Requester<T>,
        notification: &Notification,
    ) -> Result<(), ApiError> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| ApiError::validation("HIT type is not registered"))?;
        requester.set_hit_type_notification(id, notification)
    }
}

impl Record for HitType {
    const MAPPING: Mapping = &[
        ("title", "Title"),
        ("description", "Description"),
        ("reward", "Reward"),
        ("duration", "AssignmentDurationInSeconds"),
        ("keywords", "Keywords"),
    ];

    fn local_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::from(self.title.as_str()));
        fields.insert("description".into(), Value::from(self.description.as_str()));
        fields.insert("reward".into(), self.reward.to_remote());
        fields.insert("duration".into(), Value::from(self.duration));
        record::put(&mut fields, "keywords", self.keywords.as_deref());
        fields
    }

    fn from_remote(payload: &Value) -> Result<Self, ApiError> {
        let mut fields = record::local_fields_of(Self::MAPPING, payload, "HIT type")?;
        let reward = match fields.remove("reward") {
            Some(reward) => Reward::from_remote(&reward)?,
            None => return Err(ApiError::validation("invalid or missing reward")),
        };
        let hit_type = Self {
            id: record::take_string(&mut fields, "HITTypeId"),
            title: record::take_string(&mut fields, "title").unwrap_or_default(),
            description: record::take_string(&mut fields, "description").unwrap_or_default(),
            reward,
            duration: record::take_u64(&mut fields, "duration")?.unwrap_or(0),
            keywords: record::take_string(&mut fields, "keywords"),
            extra: fields,
        };
        hit_type.validate()?;
        Ok(hit_type)
    }
}
