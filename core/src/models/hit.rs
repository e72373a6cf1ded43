//! HITs: individual task postings.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::models::{Assignment, HitType, Reward};
use crate::operation::Params;
use crate::record::{self, Mapping, Record};
use crate::requester::{Page, Requester};
use crate::transport::Transport;

/// A task posting. Either belongs to a registered HIT type or carries its
/// own title, description, reward and duration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hit {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub question: Option<String>,
    pub status: Option<String>,
    pub hit_type_id: Option<String>,
    pub hit_layout_id: Option<String>,
    pub reward: Option<Reward>,
    pub duration: Option<u64>,
    /// Seconds the HIT stays available to workers.
    pub life: Option<u64>,
    pub keywords: Option<String>,
    pub max_assignments: Option<u64>,
    pub extra: Map<String, Value>,
}

impl Hit {
    pub fn builder() -> HitBuilder {
        HitBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if record::is_blank(&self.question) && record::is_blank(&self.hit_layout_id) {
            return Err(ApiError::validation(
                "either a question or a hitLayoutId must be provided",
            ));
        }
        if record::is_blank(&self.hit_type_id) {
            if record::is_blank(&self.title) {
                return Err(ApiError::validation("invalid or missing title"));
            }
            if record::is_blank(&self.description) {
                return Err(ApiError::validation("invalid or missing description"));
            }
            if self.reward.is_none() {
                return Err(ApiError::validation("invalid or missing reward"));
            }
            if self.duration.unwrap_or(0) == 0 {
                return Err(ApiError::validation("invalid or missing duration"));
            }
        }
        if let Some(reward) = &self.reward {
            reward.validate()?;
        }
        Ok(())
    }

    fn require_id(&self) -> Result<&str, ApiError> {
        self.id
            .as_deref()
            .ok_or_else(|| ApiError::validation("HIT has not been created"))
    }

    /// Create the HIT remotely, recording its id and HIT type id.
    pub fn create<T: Transport>(&mut self, requester: &Requester<T>) -> Result<(), ApiError> {
        self.validate()?;
        if self.life.unwrap_or(0) == 0 {
            return Err(ApiError::validation("invalid or missing life"));
        }
        let (id, hit_type_id) = requester.create_hit(self)?;
        self.id = Some(id);
        self.hit_type_id = Some(hit_type_id);
        Ok(())
    }

    pub fn disable<T: Transport>(&self, requester: &Requester<T>) -> Result<(), ApiError> {
        requester.disable_hit(self.require_id()?)
    }

    pub fn dispose<T: Transport>(&self, requester: &Requester<T>) -> Result<(), ApiError> {
        requester.dispose_hit(self.require_id()?)
    }

    pub fn expire<T: Transport>(&self, requester: &Requester<T>) -> Result<(), ApiError> {
        requester.expire_hit(self.require_id()?)
    }

    pub fn assignments<T: Transport>(
        &self,
        requester: &Requester<T>,
        params: Params,
    ) -> Result<Page<Assignment>, ApiError> {
        requester.get_assignments_for_hit(self.require_id()?, params)
    }

    pub fn get<T: Transport>(requester: &Requester<T>, id: &str) -> Result<Hit, ApiError> {
        requester.get_hit(id)
    }

    pub fn search<T: Transport>(requester: &Requester<T>, params: Params) -> Result<Page<Hit>, ApiError> {
        requester.search_hits(params)
    }
}

impl Record for Hit {
    const MAPPING: Mapping = &[
        ("id", "HITId"),
        ("title", "Title"),
        ("description", "Description"),
        ("question", "Question"),
        ("status", "HITStatus"),
        ("hitTypeId", "HITTypeId"),
        ("hitLayoutId", "HITLayoutId"),
        ("reward", "Reward"),
        ("duration", "AssignmentDurationInSeconds"),
        ("life", "LifetimeInSeconds"),
        ("keywords", "Keywords"),
        ("maxAssignments", "MaxAssignments"),
    ];

    fn local_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        record::put(&mut fields, "id", self.id.as_deref());
        record::put(&mut fields, "title", self.title.as_deref());
        record::put(&mut fields, "description", self.description.as_deref());
        record::put(&mut fields, "question", self.question.as_deref());
        record::put(&mut fields, "status", self.status.as_deref());
        record::put(&mut fields, "hitTypeId", self.hit_type_id.as_deref());
        record::put(&mut fields, "hitLayoutId", self.hit_layout_id.as_deref());
        record::put(&mut fields, "reward", self.reward.as_ref().map(|r| r.to_remote()));
        record::put(&mut fields, "duration", self.duration);
        record::put(&mut fields, "life", self.life);
        record::put(&mut fields, "keywords", self.keywords.as_deref());
        record::put(&mut fields, "maxAssignments", self.max_assignments);
        fields
    }

    /// Service payloads are taken as returned. Narrow response groups omit
    /// fields that `validate` requires of a new HIT.
    fn from_remote(payload: &Value) -> Result<Self, ApiError> {
        let mut fields = record::local_fields_of(Self::MAPPING, payload, "HIT")?;
        let reward = match fields.remove("reward") {
            Some(reward) => Some(Reward::from_remote(&reward)?),
            None => None,
        };
        Ok(Self {
            id: record::take_string(&mut fields, "id"),
            title: record::take_string(&mut fields, "title"),
            description: record::take_string(&mut fields, "description"),
            question: record::take_string(&mut fields, "question"),
            status: record::take_string(&mut fields, "status"),
            hit_type_id: record::take_string(&mut fields, "hitTypeId"),
            hit_layout_id: record::take_string(&mut fields, "hitLayoutId"),
            reward,
            duration: record::take_u64(&mut fields, "duration")?,
            life: record::take_u64(&mut fields, "life")?,
            keywords: record::take_string(&mut fields, "keywords"),
            max_assignments: record::take_u64(&mut fields, "maxAssignments")?,
            extra: fields,
        })
    }
}

/// Builder for new HITs; `build` runs the same checks as remote payloads.
#[derive(Debug, Default)]
pub struct HitBuilder {
    hit: Hit,
    unregistered_type: bool,
}

impl HitBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.hit.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.hit.description = Some(description.into());
        self
    }

    pub fn question(mut self, question: impl Into<String>) -> Self {
        self.hit.question = Some(question.into());
        self
    }

    pub fn hit_layout_id(mut self, layout_id: impl Into<String>) -> Self {
        self.hit.hit_layout_id = Some(layout_id.into());
        self
    }

    pub fn reward(mut self, reward: Reward) -> Self {
        self.hit.reward = Some(reward);
        self
    }

    pub fn duration(mut self, seconds: u64) -> Self {
        self.hit.duration = Some(seconds);
        self
    }

    pub fn life(mut self, seconds: u64) -> Self {
        self.hit.life = Some(seconds);
        self
    }

    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.hit.keywords = Some(keywords.into());
        self
    }

    pub fn max_assignments(mut self, count: u64) -> Self {
        self.hit.max_assignments = Some(count);
        self
    }

    pub fn hit_type_id(mut self, id: impl Into<String>) -> Self {
        self.hit.hit_type_id = Some(id.into());
        self
    }

    /// Attach a HIT type. It must already be registered.
    pub fn hit_type(mut self, hit_type: &HitType) -> Self {
        match &hit_type.id {
            Some(id) => self.hit.hit_type_id = Some(id.clone()),
            None => self.unregistered_type = true,
        }
        self
    }

    pub fn build(self) -> Result<Hit, ApiError> {
        if self.unregistered_type {
            return Err(ApiError::validation(
                "unable to associate a HIT to an unregistered HIT type",
            ));
        }
        self.hit.validate()?;
        Ok(self.hit)
    }
}
