//! In-memory stand-in for the requester endpoint.
//!
//! Accepts signed GET/POST requests on `/`, dispatches on the `Operation`
//! parameter and answers with XML documents shaped like the real service:
//! a `{Operation}Response` root, an `OperationRequest` block, and a
//! `Request` node whose `IsValid` flag carries per-request errors.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use sha1::Sha1;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_ACCESS_KEY: &str = "AKIDEXAMPLE";
pub const DEFAULT_SECRET: &str = "mock-secret";

#[derive(Clone, Debug)]
pub struct HitRow {
    pub id: String,
    pub hit_type_id: String,
    pub title: String,
    pub description: String,
    pub question: String,
    pub amount: String,
    pub currency: String,
    pub duration: String,
    pub lifetime: String,
    pub status: String,
}

#[derive(Clone, Debug)]
pub struct HitTypeRow {
    pub title: String,
    pub description: String,
    pub amount: String,
    pub currency: String,
    pub duration: String,
}

#[derive(Clone, Debug)]
pub struct AssignmentRow {
    pub id: String,
    pub hit_id: String,
    pub worker_id: String,
    pub status: String,
    pub feedback: Option<String>,
}

/// Everything the mock has been told. HITs are kept newest first.
#[derive(Default, Debug)]
pub struct Store {
    hit_types: HashMap<String, HitTypeRow>,
    hits: Vec<HitRow>,
    assignments: Vec<AssignmentRow>,
    notifications: HashMap<String, Vec<(String, String)>>,
}

impl Store {
    /// Record a submitted assignment for `hit_id`, as a worker would.
    pub fn seed_assignment(&mut self, hit_id: &str, worker_id: &str) -> String {
        let id = new_id();
        self.assignments.push(AssignmentRow {
            id: id.clone(),
            hit_id: hit_id.to_string(),
            worker_id: worker_id.to_string(),
            status: "Submitted".to_string(),
            feedback: None,
        });
        id
    }

    pub fn hit(&self, id: &str) -> Option<&HitRow> {
        self.hits.iter().find(|h| h.id == id)
    }

    pub fn assignment(&self, id: &str) -> Option<&AssignmentRow> {
        self.assignments.iter().find(|a| a.id == id)
    }

    pub fn notification(&self, hit_type_id: &str) -> Option<&[(String, String)]> {
        self.notifications.get(hit_type_id).map(Vec::as_slice)
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone, Debug)]
pub struct Credentials {
    pub access_key: String,
    pub secret: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            access_key: DEFAULT_ACCESS_KEY.to_string(),
            secret: DEFAULT_SECRET.to_string(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    db: Db,
    credentials: Arc<Credentials>,
}

pub fn app() -> Router {
    app_with(Db::default(), Credentials::default())
}

pub fn app_with(db: Db, credentials: Credentials) -> Router {
    let state = AppState {
        db,
        credentials: Arc::new(credentials),
    };
    Router::new()
        .route("/", get(handle_get).post(handle_post))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, db: Db, credentials: Credentials) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(db, credentials)).await
}

type Params = HashMap<String, String>;

async fn handle_get(State(state): State<AppState>, Query(query): Query<Vec<(String, String)>>) -> Response {
    let params = query.into_iter().collect();
    respond(&state, params).await
}

async fn handle_post(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    body: String,
) -> Response {
    let mut params: Params = query.into_iter().collect();
    for (name, value) in decode_form(&body) {
        params.entry(name).or_insert(value);
    }
    respond(&state, params).await
}

async fn respond(state: &AppState, params: Params) -> Response {
    let operation = params.get("Operation").cloned().unwrap_or_default();
    let xml = match authenticate(&state.credentials, &params) {
        Err(message) => error_document(&operation, "AWS.NotAuthorized", &message),
        Ok(()) => {
            let mut store = state.db.write().await;
            dispatch(&mut store, &operation, &params)
        }
    };
    tracing::info!(operation = %operation, "handled request");
    ([(header::CONTENT_TYPE, "text/xml")], xml).into_response()
}

/// Form bodies use URI escaping, so `+` is literal and `&`/`=` split pairs.
fn decode_form(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = percent_decode_str(value).decode_utf8_lossy().into_owned();
            (name.to_string(), value)
        })
        .collect()
}

fn authenticate(credentials: &Credentials, params: &Params) -> Result<(), String> {
    let field = |name: &str| params.get(name).map(String::as_str).unwrap_or_default();
    if field("AWSAccessKeyId") != credentials.access_key {
        return Err("unknown access key".to_string());
    }
    let mut mac = Hmac::<Sha1>::new_from_slice(credentials.secret.as_bytes())
        .map_err(|e| e.to_string())?;
    mac.update(field("Service").as_bytes());
    mac.update(field("Operation").as_bytes());
    mac.update(field("Timestamp").as_bytes());
    let expected = STANDARD.encode(mac.finalize().into_bytes());
    // Tolerate clients that leave `+` unescaped in the query string.
    if field("Signature").replace(' ', "+") != expected {
        return Err("the request signature does not match".to_string());
    }
    Ok(())
}

fn dispatch(store: &mut Store, operation: &str, params: &Params) -> String {
    let param = |name: &str| params.get(name).cloned().unwrap_or_default();
    match operation {
        "RegisterHITType" => register_hit_type(store, params),
        "CreateHIT" => create_hit(store, params),
        "GetHIT" => match store.hit(&param("HITId")) {
            Some(hit) => entity_document(operation, "HIT", &hit_xml(hit)),
            None => missing_hit(operation, &param("HITId")),
        },
        "SearchHITs" => search_hits(store, params),
        "DisableHIT" | "DisposeHIT" => {
            let id = param("HITId");
            let before = store.hits.len();
            store.hits.retain(|h| h.id != id);
            if store.hits.len() == before {
                return missing_hit(operation, &id);
            }
            result_document(operation, "")
        }
        "ForceExpireHIT" => {
            let id = param("HITId");
            match store.hits.iter_mut().find(|h| h.id == id) {
                Some(hit) => {
                    hit.status = "Reviewable".to_string();
                    result_document(operation, "")
                }
                None => missing_hit(operation, &id),
            }
        }
        "ApproveAssignment" => review(store, operation, params, "Submitted", "Approved"),
        "RejectAssignment" => review(store, operation, params, "Submitted", "Rejected"),
        "ApproveRejectedAssignment" => review(store, operation, params, "Rejected", "Approved"),
        "GetAssignment" => {
            let id = param("AssignmentId");
            let Some(assignment) = store.assignment(&id) else {
                return invalid_document(operation, "AWS.MechanicalTurk.AssignmentDoesNotExist", &format!("Assignment {id} does not exist."));
            };
            let hit = store.hit(&assignment.hit_id).map(hit_xml).unwrap_or_default();
            result_document(operation, &format!("{}<HIT>{hit}</HIT>", assignment_xml(assignment)))
        }
        "GetAssignmentsForHIT" => {
            let id = param("HITId");
            let items: Vec<String> = store
                .assignments
                .iter()
                .filter(|a| a.hit_id == id)
                .map(assignment_xml)
                .collect();
            let count = items.len();
            result_document(
                operation,
                &format!(
                    "<NumResults>{count}</NumResults><TotalNumResults>{count}</TotalNumResults>\
                     <PageNumber>1</PageNumber>{}",
                    items.join("")
                ),
            )
        }
        "SetHITTypeNotification" => {
            let id = param("HITTypeId");
            if !store.hit_types.contains_key(&id) {
                return invalid_document(operation, "AWS.MechanicalTurk.HITTypeDoesNotExist", &format!("HIT type {id} does not exist."));
            }
            match notification_fields(params) {
                Some(fields) => {
                    store.notifications.insert(id, fields);
                    result_document(operation, "")
                }
                None => invalid_document(operation, "AWS.BadParameters", "Notification.1.Destination and Transport are required."),
            }
        }
        "SendTestEventNotification" => match notification_fields(params) {
            Some(_) => result_document(operation, ""),
            None => invalid_document(operation, "AWS.BadParameters", "Notification.1.Destination and Transport are required."),
        },
        _ => error_document("", "AWS.InvalidOperation", &format!("{operation:?} is not a valid operation")),
    }
}

fn register_hit_type(store: &mut Store, params: &Params) -> String {
    let param = |name: &str| params.get(name).cloned().unwrap_or_default();
    let row = HitTypeRow {
        title: param("Title"),
        description: param("Description"),
        amount: param("Reward.1.Amount"),
        currency: param("Reward.1.CurrencyCode"),
        duration: param("AssignmentDurationInSeconds"),
    };
    if row.title.is_empty() || row.description.is_empty() || row.amount.is_empty() || row.duration.is_empty() {
        return invalid_document("RegisterHITType", "AWS.BadParameters", "Title, Description, Reward and AssignmentDurationInSeconds are required.");
    }
    let id = new_id();
    store.hit_types.insert(id.clone(), row);
    result_document("RegisterHITType", &format!("<HITTypeId>{id}</HITTypeId>"))
}

fn create_hit(store: &mut Store, params: &Params) -> String {
    let param = |name: &str| params.get(name).cloned().unwrap_or_default();
    let question = param("Question");
    let lifetime = param("LifetimeInSeconds");
    if question.is_empty() && param("HITLayoutId").is_empty() {
        return invalid_document("CreateHIT", "AWS.BadParameters", "Question or HITLayoutId is required.");
    }
    if lifetime.is_empty() {
        return invalid_document("CreateHIT", "AWS.BadParameters", "LifetimeInSeconds is required.");
    }

    let hit_type_id = match params.get("HITTypeId") {
        Some(id) if store.hit_types.contains_key(id) => id.clone(),
        Some(id) => {
            return invalid_document("CreateHIT", "AWS.MechanicalTurk.HITTypeDoesNotExist", &format!("HIT type {id} does not exist."))
        }
        None => {
            let row = HitTypeRow {
                title: param("Title"),
                description: param("Description"),
                amount: param("Reward.1.Amount"),
                currency: param("Reward.1.CurrencyCode"),
                duration: param("AssignmentDurationInSeconds"),
            };
            let id = new_id();
            store.hit_types.insert(id.clone(), row);
            id
        }
    };
    let hit_type = store.hit_types[&hit_type_id].clone();
    let hit = HitRow {
        id: new_id(),
        hit_type_id,
        title: hit_type.title,
        description: hit_type.description,
        question,
        amount: hit_type.amount,
        currency: hit_type.currency,
        duration: hit_type.duration,
        lifetime,
        status: "Assignable".to_string(),
    };
    let body = format!(
        "<HITId>{}</HITId><HITTypeId>{}</HITTypeId>",
        hit.id, hit.hit_type_id
    );
    store.hits.insert(0, hit);
    entity_document("CreateHIT", "HIT", &body)
}

fn search_hits(store: &Store, params: &Params) -> String {
    let page_size: usize = params
        .get("PageSize")
        .and_then(|s| s.parse().ok())
        .unwrap_or(10)
        .clamp(1, 100);
    let page_number: usize = params
        .get("PageNumber")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1)
        .max(1);
    let page: Vec<String> = store
        .hits
        .iter()
        .skip(page_number.saturating_sub(1).saturating_mul(page_size))
        .take(page_size)
        .map(|h| format!("<HIT>{}</HIT>", hit_xml(h)))
        .collect();
    result_document(
        "SearchHITs",
        &format!(
            "<NumResults>{}</NumResults><TotalNumResults>{}</TotalNumResults>\
             <PageNumber>{page_number}</PageNumber>{}",
            page.len(),
            store.hits.len(),
            page.join("")
        ),
    )
}

fn review(store: &mut Store, operation: &str, params: &Params, from: &str, to: &str) -> String {
    let id = params.get("AssignmentId").cloned().unwrap_or_default();
    let Some(assignment) = store.assignments.iter_mut().find(|a| a.id == id) else {
        return invalid_document(operation, "AWS.MechanicalTurk.AssignmentDoesNotExist", &format!("Assignment {id} does not exist."));
    };
    if assignment.status != from {
        return invalid_document(
            operation,
            "AWS.MechanicalTurk.InvalidAssignmentState",
            &format!("Assignment {id} is {}, expected {from}.", assignment.status),
        );
    }
    assignment.status = to.to_string();
    assignment.feedback = params.get("RequesterFeedback").cloned();
    result_document(operation, "")
}

fn notification_fields(params: &Params) -> Option<Vec<(String, String)>> {
    const PREFIX: &str = "Notification.1.";
    if !params.contains_key("Notification.1.Destination") || !params.contains_key("Notification.1.Transport") {
        return None;
    }
    let mut fields: Vec<(String, String)> = params
        .iter()
        .filter_map(|(k, v)| k.strip_prefix(PREFIX).map(|name| (name.to_string(), v.clone())))
        .collect();
    fields.sort();
    Some(fields)
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()[..30].to_string()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn hit_xml(hit: &HitRow) -> String {
    format!(
        "<HITId>{}</HITId><HITTypeId>{}</HITTypeId><Title>{}</Title><Description>{}</Description>\
         <Question>{}</Question><HITStatus>{}</HITStatus>\
         <Reward><Amount>{}</Amount><CurrencyCode>{}</CurrencyCode></Reward>\
         <AssignmentDurationInSeconds>{}</AssignmentDurationInSeconds>\
         <LifetimeInSeconds>{}</LifetimeInSeconds>",
        hit.id,
        hit.hit_type_id,
        escape(&hit.title),
        escape(&hit.description),
        escape(&hit.question),
        hit.status,
        escape(&hit.amount),
        escape(&hit.currency),
        escape(&hit.duration),
        escape(&hit.lifetime),
    )
}

fn assignment_xml(assignment: &AssignmentRow) -> String {
    format!(
        "<Assignment><AssignmentId>{}</AssignmentId><WorkerId>{}</WorkerId><HITId>{}</HITId>\
         <AssignmentStatus>{}</AssignmentStatus></Assignment>",
        assignment.id,
        escape(&assignment.worker_id),
        assignment.hit_id,
        assignment.status
    )
}

const VALID: &str = "<Request><IsValid>True</IsValid></Request>";

fn operation_request() -> String {
    format!("<OperationRequest><RequestId>{}</RequestId></OperationRequest>", Uuid::new_v4())
}

/// `<{op}Response>` with the payload inside `<{op}Result>`.
fn result_document(operation: &str, payload: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<{operation}Response>{}<{operation}Result>{VALID}{payload}\
         </{operation}Result></{operation}Response>",
        operation_request()
    )
}

/// `<{op}Response>` with the payload inside a named entity element.
fn entity_document(operation: &str, entity: &str, payload: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<{operation}Response>{}<{entity}>{VALID}{payload}</{entity}>\
         </{operation}Response>",
        operation_request()
    )
}

/// A request the service understood but refused.
fn invalid_document(operation: &str, code: &str, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<{operation}Response>{}<{operation}Result><Request>\
         <IsValid>False</IsValid><Errors><Error><Code>{code}</Code><Message>{}</Message></Error>\
         </Errors></Request></{operation}Result></{operation}Response>",
        operation_request(),
        escape(message)
    )
}

fn missing_hit(operation: &str, id: &str) -> String {
    invalid_document(operation, "AWS.MechanicalTurk.HITDoesNotExist", &format!("Hit {id} does not exist."))
}

/// Errors raised before dispatch, reported on the response root.
fn error_document(operation: &str, code: &str, message: &str) -> String {
    let root = format!("{operation}Response");
    format!(
        "<?xml version=\"1.0\"?>\n<{root}>{}<Errors><Error><Code>{code}</Code><Message>{}</Message>\
         </Error></Errors></{root}>",
        operation_request(),
        escape(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(operation: &str) -> Params {
        let credentials = Credentials::default();
        let timestamp = "2013-01-01T00:00:00.000Z";
        let mut mac = Hmac::<Sha1>::new_from_slice(credentials.secret.as_bytes()).unwrap();
        mac.update(format!("AWSMechanicalTurkRequester{operation}{timestamp}").as_bytes());
        let mut params = Params::new();
        params.insert("Service".into(), "AWSMechanicalTurkRequester".into());
        params.insert("Operation".into(), operation.into());
        params.insert("AWSAccessKeyId".into(), credentials.access_key);
        params.insert("Timestamp".into(), timestamp.into());
        params.insert("Signature".into(), STANDARD.encode(mac.finalize().into_bytes()));
        params
    }

    #[test]
    fn accepts_correct_signature() {
        assert!(authenticate(&Credentials::default(), &signed("GetHIT")).is_ok());
    }

    #[test]
    fn rejects_tampered_operation() {
        let mut params = signed("GetHIT");
        params.insert("Operation".into(), "DisposeHIT".into());
        assert!(authenticate(&Credentials::default(), &params).is_err());
    }

    #[test]
    fn rejects_unknown_access_key() {
        let mut params = signed("GetHIT");
        params.insert("AWSAccessKeyId".into(), "someone-else".into());
        assert!(authenticate(&Credentials::default(), &params).is_err());
    }

    #[test]
    fn decodes_uri_escaped_form() {
        assert_eq!(
            decode_form("Title=Test&Description=Test%20description&Reward.1.Amount=0.01"),
            vec![
                ("Title".to_string(), "Test".to_string()),
                ("Description".to_string(), "Test description".to_string()),
                ("Reward.1.Amount".to_string(), "0.01".to_string()),
            ]
        );
    }

    #[test]
    fn escapes_markup_in_text() {
        assert_eq!(escape("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn ids_look_like_service_ids() {
        let id = new_id();
        assert_eq!(id.len(), 30);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn huge_page_number_yields_an_empty_page() {
        let mut params = Params::new();
        params.insert("PageNumber".into(), usize::MAX.to_string());
        params.insert("PageSize".into(), "100".into());
        let xml = search_hits(&Store::default(), &params);
        assert!(xml.contains("<NumResults>0</NumResults>"));
        assert!(xml.contains(&format!("<PageNumber>{}</PageNumber>", usize::MAX)));
    }

    #[test]
    fn hits_are_listed_newest_first() {
        let mut store = Store::default();
        let mut params = Params::new();
        params.insert("Title".into(), "t".into());
        params.insert("Description".into(), "d".into());
        params.insert("Reward.1.Amount".into(), "0.01".into());
        params.insert("AssignmentDurationInSeconds".into(), "60".into());
        params.insert("Question".into(), "q".into());
        params.insert("LifetimeInSeconds".into(), "600".into());
        create_hit(&mut store, &params);
        create_hit(&mut store, &params);
        let newest = store.hits[0].id.clone();
        let xml = search_hits(&store, &Params::new());
        let first = xml.find("<HITId>").unwrap();
        assert_eq!(&xml[first + 7..first + 7 + newest.len()], newest);
    }
}
