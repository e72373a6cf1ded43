//! Assignments: a worker's submission for a HIT.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::models::Hit;
use crate::record::{self, Mapping, Record};
use crate::requester::Requester;
use crate::transport::Transport;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    pub id: Option<String>,
    pub life: Option<u64>,
    pub worker_id: Option<String>,
    pub hit_id: Option<String>,
    /// `Submitted`, `Approved` or `Rejected`.
    pub status: Option<String>,
    pub answer: Option<String>,
    pub extra: Map<String, Value>,
}

impl Assignment {
    fn require_id(&self) -> Result<&str, ApiError> {
        self.id
            .as_deref()
            .ok_or_else(|| ApiError::validation("assignment has no id"))
    }

    pub fn approve<T: Transport>(&self, requester: &Requester<T>, feedback: Option<&str>) -> Result<(), ApiError> {
        requester.approve_assignment(self.require_id()?, feedback)
    }

    pub fn reject<T: Transport>(&self, requester: &Requester<T>, feedback: Option<&str>) -> Result<(), ApiError> {
        requester.reject_assignment(self.require_id()?, feedback)
    }

    pub fn approve_rejected<T: Transport>(
        &self,
        requester: &Requester<T>,
        feedback: Option<&str>,
    ) -> Result<(), ApiError> {
        requester.approve_rejected_assignment(self.require_id()?, feedback)
    }

    /// Fetch an assignment together with its HIT.
    pub fn get<T: Transport>(requester: &Requester<T>, id: &str) -> Result<(Assignment, Hit), ApiError> {
        requester.get_assignment(id)
    }
}

impl Record for Assignment {
    const MAPPING: Mapping = &[
        ("id", "AssignmentId"),
        ("life", "LifetimeInSeconds"),
        ("workerId", "WorkerId"),
        ("hitId", "HITId"),
        ("status", "AssignmentStatus"),
        ("answer", "Answer"),
    ];

    fn local_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        record::put(&mut fields, "id", self.id.as_deref());
        record::put(&mut fields, "life", self.life);
        record::put(&mut fields, "workerId", self.worker_id.as_deref());
        record::put(&mut fields, "hitId", self.hit_id.as_deref());
        record::put(&mut fields, "status", self.status.as_deref());
        record::put(&mut fields, "answer", self.answer.as_deref());
        fields
    }

    fn from_remote(payload: &Value) -> Result<Self, ApiError> {
        let mut fields = record::local_fields_of(Self::MAPPING, payload, "assignment")?;
        Ok(Self {
            id: record::take_string(&mut fields, "id"),
            life: record::take_u64(&mut fields, "life")?,
            worker_id: record::take_string(&mut fields, "workerId"),
            hit_id: record::take_string(&mut fields, "hitId"),
            status: record::take_string(&mut fields, "status"),
            answer: record::take_string(&mut fields, "answer"),
            extra: fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_service_payload() {
        let assignment = Assignment::from_remote(&json!({
            "AssignmentId": "A1",
            "WorkerId": "W1",
            "HITId": "H1",
            "AssignmentStatus": "Submitted",
            "SubmitTime": "2013-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(assignment.id.as_deref(), Some("A1"));
        assert_eq!(assignment.status.as_deref(), Some("Submitted"));
        assert_eq!(assignment.extra["SubmitTime"], "2013-01-01T00:00:00Z");
        assert!(assignment.extra.get("AssignmentId").is_none());
    }

    #[test]
    fn remote_round_trip() {
        let assignment = Assignment {
            id: Some("A1".into()),
            life: Some(60),
            worker_id: Some("W1".into()),
            hit_id: Some("H1".into()),
            status: Some("Approved".into()),
            answer: Some("<Answer/>".into()),
            extra: Map::new(),
        };
        assert_eq!(Assignment::from_remote(&assignment.to_remote()).unwrap(), assignment);
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(matches!(
            Assignment::from_remote(&json!("A1")),
            Err(ApiError::Validation(_))
        ));
    }
}
