//! Operation dispatch over a `Transport`.
//!
//! # Design
//! Each supported operation is a thin method: it assembles an `Operation`,
//! runs it through `RequesterClient` and the transport exactly once, and
//! reshapes the validated payload into domain values. Nothing is cached or
//! retried; the first failure is returned.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::client::RequesterClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{Assignment, EventType, Hit, HitType, Notification};
use crate::operation::{Operation, Params};
use crate::record::Record;
use crate::response::{as_list, counter};
use crate::transport::{Transport, UreqTransport};

/// Response groups requested for HIT reads.
pub const HIT_RESPONSE_GROUPS: [&str; 4] = ["Minimal", "HITDetail", "HITQuestion", "HITAssignmentSummary"];

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub num_results: u32,
    pub page_number: u32,
    pub total_num_results: u32,
}

impl<T> Page<T> {
    fn from_payload(
        payload: &mut Map<String, Value>,
        item_name: &str,
        parse: impl Fn(&Value) -> Result<T, ApiError>,
    ) -> Result<Self, ApiError> {
        let num_results = counter(payload, "NumResults")?;
        let page_number = counter(payload, "PageNumber")?;
        let total_num_results = counter(payload, "TotalNumResults")?;
        let items = as_list(payload.remove(item_name))
            .iter()
            .map(parse)
            .collect::<Result<Vec<T>, ApiError>>()?;
        Ok(Self {
            items,
            num_results,
            page_number,
            total_num_results,
        })
    }
}

/// A client bound to a transport. Safe to share across threads; calls do
/// not serialize against each other.
#[derive(Debug, Clone)]
pub struct Requester<T = UreqTransport> {
    client: RequesterClient,
    transport: T,
}

impl Requester<UreqTransport> {
    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::new(RequesterClient::new(config)?, UreqTransport::new()))
    }
}

impl<T: Transport> Requester<T> {
    pub fn new(client: RequesterClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &RequesterClient {
        &self.client
    }

    /// Sign, send and validate one operation.
    pub fn call(&self, op: &Operation) -> Result<Map<String, Value>, ApiError> {
        let request = self.client.build_request(op, Utc::now())?;
        let response = self.transport.execute(&request)?;
        self.client.parse_response(op, response)
    }

    /// Register a HIT type and return its id.
    pub fn register_hit_type(&self, hit_type: &HitType) -> Result<String, ApiError> {
        let op = Operation::post("RegisterHITType").body(hit_type);
        let payload = self.call(&op)?;
        text_field(&payload, "HITTypeId")
    }

    /// Create a HIT and return `(HITId, HITTypeId)`.
    pub fn create_hit(&self, hit: &Hit) -> Result<(String, String), ApiError> {
        let op = Operation::post("CreateHIT").body(hit);
        let payload = self.call(&op)?;
        let Some(Value::Object(created)) = payload.get("HIT") else {
            return Err(ApiError::malformed("missing HIT in CreateHIT response"));
        };
        Ok((text_field(created, "HITId")?, text_field(created, "HITTypeId")?))
    }

    pub fn get_hit(&self, hit_id: &str) -> Result<Hit, ApiError> {
        let op = Operation::get("GetHIT")
            .param("HITId", Value::from(hit_id))
            .param("ResponseGroup", response_groups());
        let payload = self.call(&op)?;
        Hit::from_remote(&element(payload, "HIT"))
    }

    pub fn disable_hit(&self, hit_id: &str) -> Result<(), ApiError> {
        self.call(&Operation::get("DisableHIT").param("HITId", Value::from(hit_id)))
            .map(drop)
    }

    pub fn dispose_hit(&self, hit_id: &str) -> Result<(), ApiError> {
        self.call(&Operation::get("DisposeHIT").param("HITId", Value::from(hit_id)))
            .map(drop)
    }

    pub fn expire_hit(&self, hit_id: &str) -> Result<(), ApiError> {
        self.call(&Operation::get("ForceExpireHIT").param("HITId", Value::from(hit_id)))
            .map(drop)
    }

    /// Search HITs. `params` (e.g. `PageSize`, `SortProperty`) override the
    /// default response groups.
    pub fn search_hits(&self, params: Params) -> Result<Page<Hit>, ApiError> {
        let op = Operation::get("SearchHITs")
            .param("ResponseGroup", response_groups())
            .params(params);
        let mut payload = self.call(&op)?;
        Page::from_payload(&mut payload, "HIT", Hit::from_remote)
    }

    pub fn approve_assignment(&self, assignment_id: &str, feedback: Option<&str>) -> Result<(), ApiError> {
        self.review("ApproveAssignment", assignment_id, feedback)
    }

    pub fn reject_assignment(&self, assignment_id: &str, feedback: Option<&str>) -> Result<(), ApiError> {
        self.review("RejectAssignment", assignment_id, feedback)
    }

    pub fn approve_rejected_assignment(
        &self,
        assignment_id: &str,
        feedback: Option<&str>,
    ) -> Result<(), ApiError> {
        self.review("ApproveRejectedAssignment", assignment_id, feedback)
    }

    fn review(&self, operation: &str, assignment_id: &str, feedback: Option<&str>) -> Result<(), ApiError> {
        let op = Operation::get(operation)
            .param("AssignmentId", Value::from(assignment_id))
            .param("RequesterFeedback", feedback.map(Value::from));
        self.call(&op).map(drop)
    }

    /// Fetch an assignment and the HIT it belongs to.
    pub fn get_assignment(&self, assignment_id: &str) -> Result<(Assignment, Hit), ApiError> {
        let op = Operation::get("GetAssignment").param("AssignmentId", Value::from(assignment_id));
        let mut payload = self.call(&op)?;
        let assignment = payload
            .remove("Assignment")
            .ok_or_else(|| ApiError::malformed("missing Assignment in GetAssignment response"))?;
        let hit = payload
            .remove("HIT")
            .ok_or_else(|| ApiError::malformed("missing HIT in GetAssignment response"))?;
        Ok((Assignment::from_remote(&assignment)?, Hit::from_remote(&hit)?))
    }

    pub fn get_assignments_for_hit(&self, hit_id: &str, params: Params) -> Result<Page<Assignment>, ApiError> {
        let op = Operation::get("GetAssignmentsForHIT")
            .param("HITId", Value::from(hit_id))
            .params(params);
        let mut payload = self.call(&op)?;
        Page::from_payload(&mut payload, "Assignment", Assignment::from_remote)
    }

    pub fn set_hit_type_notification(&self, hit_type_id: &str, notification: &Notification) -> Result<(), ApiError> {
        let op = Operation::post("SetHITTypeNotification")
            .param("HITTypeId", Value::from(hit_type_id))
            .body(notification);
        self.call(&op).map(drop)
    }

    /// Ask the service to deliver a test `event` to `notification`.
    pub fn send_test_event_notification(&self, event: EventType, notification: &Notification) -> Result<(), ApiError> {
        let op = Operation::post("SendTestEventNotification")
            .param("TestEventType", Value::from(event.as_str()))
            .body(notification);
        self.call(&op).map(drop)
    }

    /// Operations this client does not support fail without a request.
    pub fn unsupported(&self, op: UnsupportedOperation) -> Result<Map<String, Value>, ApiError> {
        Err(ApiError::NotImplemented(op.name()))
    }
}

fn response_groups() -> Value {
    Value::from(HIT_RESPONSE_GROUPS.to_vec())
}

/// The named element of a payload, or the payload itself when absent.
/// The element's own `Request` marker is dropped.
fn element(mut payload: Map<String, Value>, name: &str) -> Value {
    match payload.remove(name) {
        Some(Value::Object(mut inner)) => {
            inner.shift_remove("Request");
            Value::Object(inner)
        }
        Some(other) => other,
        None => Value::Object(payload),
    }
}

fn text_field(payload: &Map<String, Value>, name: &str) -> Result<String, ApiError> {
    match payload.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(ApiError::malformed(format!("missing {name}"))),
    }
}

/// Requester operations that exist remotely but are not supported here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedOperation {
    ExtendHit,
    SetHitAsReviewing,
    GetReviewableHits,
    GetReviewResultsForHit,
    GetAccountBalance,
    GetRequesterStatistic,
    GetRequesterWorkerStatistic,
    AssignQualification,
    BlockWorker,
    ChangeHitTypeOfHit,
    CreateQualificationType,
    DisposeQualificationType,
    GetBlockedWorkers,
    GetBonusPayments,
    GetFileUploadUrl,
    GetHitsForQualificationType,
    GetQualificationsForQualificationType,
    GetQualificationRequests,
    GetQualificationScore,
    GetQualificationType,
    GrantBonus,
    GrantQualification,
    Help,
    NotifyWorkers,
    RejectQualificationRequest,
    RevokeQualification,
    SearchQualificationTypes,
    UnblockWorker,
    UpdateQualificationScore,
    UpdateQualificationType,
}

impl UnsupportedOperation {
    /// Remote operation name.
    pub fn name(self) -> &'static str {
        use UnsupportedOperation::*;
        match self {
            ExtendHit => "ExtendHIT",
            SetHitAsReviewing => "SetHITAsReviewing",
            GetReviewableHits => "GetReviewableHITs",
            GetReviewResultsForHit => "GetReviewResultsForHIT",
            GetAccountBalance => "GetAccountBalance",
            GetRequesterStatistic => "GetRequesterStatistic",
            GetRequesterWorkerStatistic => "GetRequesterWorkerStatistic",
            AssignQualification => "AssignQualification",
            BlockWorker => "BlockWorker",
            ChangeHitTypeOfHit => "ChangeHITTypeOfHIT",
            CreateQualificationType => "CreateQualificationType",
            DisposeQualificationType => "DisposeQualificationType",
            GetBlockedWorkers => "GetBlockedWorkers",
            GetBonusPayments => "GetBonusPayments",
            GetFileUploadUrl => "GetFileUploadURL",
            GetHitsForQualificationType => "GetHITsForQualificationType",
            GetQualificationsForQualificationType => "GetQualificationsForQualificationType",
            GetQualificationRequests => "GetQualificationRequests",
            GetQualificationScore => "GetQualificationScore",
            GetQualificationType => "GetQualificationType",
            GrantBonus => "GrantBonus",
            GrantQualification => "GrantQualification",
            Help => "Help",
            NotifyWorkers => "NotifyWorkers",
            RejectQualificationRequest => "RejectQualificationRequest",
            RevokeQualification => "RevokeQualification",
            SearchQualificationTypes => "SearchQualificationTypes",
            UnblockWorker => "UnblockWorker",
            UpdateQualificationScore => "UpdateQualificationScore",
            UpdateQualificationType => "UpdateQualificationType",
        }
    }
}
