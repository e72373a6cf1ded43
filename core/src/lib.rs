//! Client core for the Mechanical Turk requester API.
//!
//! # Overview
//! Domain records (HIT types, HITs, assignments, rewards, notifications)
//! are built locally, encoded into the service's flattened form, sent as
//! signed requests and read back from XML responses.
//!
//! # Design
//! - `RequesterClient` is stateless: `build_request` signs and encodes an
//!   `Operation` into plain-data `HttpRequest`, `parse_response` validates
//!   an `HttpResponse`. No I/O happens in either.
//! - `Requester` pairs a client with a `Transport` and exposes one method
//!   per supported operation. Each call is one round-trip, no retries.
//! - Records share a table-driven mapping layer (`record`) and validate
//!   required fields when constructed, before any network activity.

pub mod client;
pub mod config;
pub mod encode;
pub mod error;
pub mod http;
pub mod models;
pub mod operation;
pub mod record;
pub mod requester;
pub mod response;
pub mod signer;
pub mod transport;
pub mod xml;

pub use client::RequesterClient;
pub use config::ClientConfig;
pub use error::{ApiError, ServiceError, ServiceErrors};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use models::{Assignment, EventType, Hit, HitType, Notification, NotificationTransport, Reward};
pub use operation::{Operation, Params};
pub use record::Record;
pub use requester::{Page, Requester, UnsupportedOperation};
pub use signer::Credential;
pub use transport::{Transport, UreqTransport};
