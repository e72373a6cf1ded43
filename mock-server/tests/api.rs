use axum::http::{self, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use mock_server::{app, app_with, Credentials, Db, DEFAULT_ACCESS_KEY, DEFAULT_SECRET};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sha1::Sha1;
use tower::ServiceExt;

const TIMESTAMP: &str = "2013-01-01T00:00:00.000Z";

async fn body_text(response: axum::response::Response) -> String {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn signature(secret: &str, operation: &str) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("AWSMechanicalTurkRequester{operation}{TIMESTAMP}").as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

fn query(secret: &str, operation: &str, params: &[(&str, &str)]) -> String {
    let sig = signature(secret, operation);
    let mut pairs = vec![
        ("Service", "AWSMechanicalTurkRequester"),
        ("Operation", operation),
        ("AWSAccessKeyId", DEFAULT_ACCESS_KEY),
        ("Version", "2012-03-25"),
        ("Signature", sig.as_str()),
        ("Timestamp", TIMESTAMP),
    ];
    pairs.extend_from_slice(params);
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, NON_ALPHANUMERIC)))
        .collect::<Vec<_>>()
        .join("&")
}

fn get(operation: &str, params: &[(&str, &str)]) -> Request<String> {
    Request::builder()
        .uri(format!("/?{}", query(DEFAULT_SECRET, operation, params)))
        .body(String::new())
        .unwrap()
}

fn post(operation: &str, form: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(format!("/?{}", query(DEFAULT_SECRET, operation, &[])))
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(form.to_string())
        .unwrap()
}

/// Text of the first `<name>` element in `xml`.
fn element<'a>(xml: &'a str, name: &str) -> &'a str {
    let open = format!("<{name}>");
    let start = xml.find(&open).unwrap_or_else(|| panic!("no <{name}> in {xml}")) + open.len();
    let end = xml[start..].find(&format!("</{name}>")).unwrap() + start;
    &xml[start..end]
}

const HIT_TYPE_FORM: &str = "Title=Test&Description=Test%20description&Reward.1.Amount=0.01\
                             &Reward.1.CurrencyCode=USD&AssignmentDurationInSeconds=60";

async fn register(app: axum::Router) -> String {
    let resp = app.oneshot(post("RegisterHITType", HIT_TYPE_FORM)).await.unwrap();
    let xml = body_text(resp).await;
    element(&xml, "HITTypeId").to_string()
}

// --- authentication ---

#[tokio::test]
async fn bad_signature_is_reported_on_root() {
    let uri = format!("/?{}", query("wrong-secret", "GetHIT", &[("HITId", "H1")]));
    let resp = app()
        .oneshot(Request::builder().uri(uri).body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let xml = body_text(resp).await;
    assert!(xml.contains("<GetHITResponse>"));
    assert_eq!(element(&xml, "Code"), "AWS.NotAuthorized");
}

#[tokio::test]
async fn custom_credentials_are_enforced() {
    let credentials = Credentials {
        access_key: DEFAULT_ACCESS_KEY.to_string(),
        secret: "rotated".to_string(),
    };
    let resp = app_with(Db::default(), credentials)
        .oneshot(get("SearchHITs", &[]))
        .await
        .unwrap();
    assert_eq!(element(&body_text(resp).await, "Code"), "AWS.NotAuthorized");
}

#[tokio::test]
async fn unknown_operation_uses_generic_root() {
    let resp = app().oneshot(get("Frobnicate", &[])).await.unwrap();
    let xml = body_text(resp).await;
    assert!(xml.contains("<Response>"));
    assert_eq!(element(&xml, "Code"), "AWS.InvalidOperation");
}

// --- HIT types and HITs ---

#[tokio::test]
async fn register_hit_type_returns_id() {
    let db = Db::default();
    let id = register(app_with(db, Credentials::default())).await;
    assert_eq!(id.len(), 30);
}

#[tokio::test]
async fn register_hit_type_requires_fields() {
    let resp = app().oneshot(post("RegisterHITType", "Title=Test")).await.unwrap();
    let xml = body_text(resp).await;
    assert_eq!(element(&xml, "IsValid"), "False");
    assert_eq!(element(&xml, "Code"), "AWS.BadParameters");
}

#[tokio::test]
async fn get_missing_hit_is_invalid_request() {
    let resp = app().oneshot(get("GetHIT", &[("HITId", "NOPE")])).await.unwrap();
    let xml = body_text(resp).await;
    assert!(xml.contains("<GetHITResponse>"));
    assert_eq!(element(&xml, "IsValid"), "False");
    assert_eq!(element(&xml, "Code"), "AWS.MechanicalTurk.HITDoesNotExist");
}

#[tokio::test]
async fn hit_lifecycle() {
    let db = Db::default();
    let app = || app_with(db.clone(), Credentials::default());

    let type_id = register(app()).await;

    // create
    let form = format!("HITTypeId={type_id}&Question=What%20is%20this%3F&LifetimeInSeconds=600");
    let resp = app().oneshot(post("CreateHIT", &form)).await.unwrap();
    let xml = body_text(resp).await;
    assert_eq!(element(&xml, "IsValid"), "True");
    assert_eq!(element(&xml, "HITTypeId"), type_id);
    let hit_id = element(&xml, "HITId").to_string();

    // get
    let resp = app().oneshot(get("GetHIT", &[("HITId", hit_id.as_str())])).await.unwrap();
    let xml = body_text(resp).await;
    assert_eq!(element(&xml, "Title"), "Test");
    assert_eq!(element(&xml, "Question"), "What is this?");
    assert_eq!(element(&xml, "Amount"), "0.01");

    // search
    let resp = app().oneshot(get("SearchHITs", &[])).await.unwrap();
    let xml = body_text(resp).await;
    assert_eq!(element(&xml, "PageNumber"), "1");
    assert_eq!(element(&xml, "TotalNumResults"), "1");
    assert_eq!(element(&xml, "HITId"), hit_id);

    // expire
    let resp = app().oneshot(get("ForceExpireHIT", &[("HITId", hit_id.as_str())])).await.unwrap();
    assert_eq!(element(&body_text(resp).await, "IsValid"), "True");
    assert_eq!(db.read().await.hit(&hit_id).unwrap().status, "Reviewable");

    // dispose
    let resp = app().oneshot(get("DisposeHIT", &[("HITId", hit_id.as_str())])).await.unwrap();
    assert_eq!(element(&body_text(resp).await, "IsValid"), "True");
    assert!(db.read().await.hit(&hit_id).is_none());

    // dispose again
    let resp = app().oneshot(get("DisposeHIT", &[("HITId", hit_id.as_str())])).await.unwrap();
    assert_eq!(element(&body_text(resp).await, "IsValid"), "False");
}

#[tokio::test]
async fn create_hit_needs_question_and_lifetime() {
    let resp = app()
        .oneshot(post("CreateHIT", "HITTypeId=T1&LifetimeInSeconds=60"))
        .await
        .unwrap();
    assert_eq!(element(&body_text(resp).await, "Code"), "AWS.BadParameters");

    let resp = app()
        .oneshot(post("CreateHIT", "HITTypeId=T1&Question=q"))
        .await
        .unwrap();
    assert_eq!(element(&body_text(resp).await, "Code"), "AWS.BadParameters");
}

#[tokio::test]
async fn search_pages_through_hits() {
    let db = Db::default();
    let app = || app_with(db.clone(), Credentials::default());
    let type_id = register(app()).await;
    for _ in 0..3 {
        let form = format!("HITTypeId={type_id}&Question=q&LifetimeInSeconds=600");
        app().oneshot(post("CreateHIT", &form)).await.unwrap();
    }

    let resp = app()
        .oneshot(get("SearchHITs", &[("PageSize", "2"), ("PageNumber", "2")]))
        .await
        .unwrap();
    let xml = body_text(resp).await;
    assert_eq!(element(&xml, "NumResults"), "1");
    assert_eq!(element(&xml, "TotalNumResults"), "3");
    assert_eq!(element(&xml, "PageNumber"), "2");
}

// --- assignments ---

#[tokio::test]
async fn assignment_review_transitions() {
    let db = Db::default();
    let app = || app_with(db.clone(), Credentials::default());
    let assignment_id = db.write().await.seed_assignment("H1", "W1");

    let resp = app()
        .oneshot(get("RejectAssignment", &[("AssignmentId", assignment_id.as_str()), ("RequesterFeedback", "blurry")]))
        .await
        .unwrap();
    assert_eq!(element(&body_text(resp).await, "IsValid"), "True");
    {
        let store = db.read().await;
        let assignment = store.assignment(&assignment_id).unwrap();
        assert_eq!(assignment.status, "Rejected");
        assert_eq!(assignment.feedback.as_deref(), Some("blurry"));
    }

    // only submitted work can be approved directly
    let resp = app()
        .oneshot(get("ApproveAssignment", &[("AssignmentId", assignment_id.as_str())]))
        .await
        .unwrap();
    assert_eq!(
        element(&body_text(resp).await, "Code"),
        "AWS.MechanicalTurk.InvalidAssignmentState"
    );

    let resp = app()
        .oneshot(get("ApproveRejectedAssignment", &[("AssignmentId", assignment_id.as_str())]))
        .await
        .unwrap();
    assert_eq!(element(&body_text(resp).await, "IsValid"), "True");
    assert_eq!(db.read().await.assignment(&assignment_id).unwrap().status, "Approved");
}

#[tokio::test]
async fn assignments_for_hit_are_listed() {
    let db = Db::default();
    {
        let mut store = db.write().await;
        store.seed_assignment("H1", "W1");
        store.seed_assignment("H1", "W2");
        store.seed_assignment("H2", "W3");
    }
    let resp = app_with(db, Credentials::default())
        .oneshot(get("GetAssignmentsForHIT", &[("HITId", "H1")]))
        .await
        .unwrap();
    let xml = body_text(resp).await;
    assert_eq!(element(&xml, "NumResults"), "2");
    assert_eq!(xml.matches("<Assignment>").count(), 2);
}

// --- notifications ---

#[tokio::test]
async fn notification_is_stored_per_hit_type() {
    let db = Db::default();
    let app = || app_with(db.clone(), Credentials::default());
    let type_id = register(app()).await;

    let form = "Notification.1.Destination=ops@example.com&Notification.1.Transport=Email\
                &Notification.1.EventType.1=AssignmentSubmitted&Notification.1.Version=2006-05-05\
                &Notification.1.Active=true";
    let uri = format!(
        "/?{}",
        query(DEFAULT_SECRET, "SetHITTypeNotification", &[("HITTypeId", type_id.as_str())])
    );
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(form.to_string())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(element(&body_text(resp).await, "IsValid"), "True");

    let store = db.read().await;
    let fields = store.notification(&type_id).unwrap();
    assert!(fields.contains(&("Destination".to_string(), "ops@example.com".to_string())));
    assert!(fields.contains(&("EventType.1".to_string(), "AssignmentSubmitted".to_string())));
}

#[tokio::test]
async fn test_event_needs_destination() {
    let resp = app()
        .oneshot(post("SendTestEventNotification", "Notification.1.Transport=Email"))
        .await
        .unwrap();
    assert_eq!(element(&body_text(resp).await, "Code"), "AWS.BadParameters");
}
