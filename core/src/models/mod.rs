//! Domain records of the requester API.
//!
//! Each record implements `Record` over its own mapping table and validates
//! required fields when constructed, locally or from a remote payload.
//! Operations that need the service take a `Requester` explicitly.

pub mod assignment;
pub mod hit;
pub mod hit_type;
pub mod notification;
pub mod reward;

pub use assignment::Assignment;
pub use hit::{Hit, HitBuilder};
pub use hit_type::HitType;
pub use notification::{EventType, Notification, NotificationTransport, NOTIFICATION_VERSION};
pub use reward::Reward;
