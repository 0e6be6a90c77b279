//! Per-collection repositories.
//!
//! Every repo is a stateless struct whose methods take `&Connection`,
//! so the high-level store decides pooling, locking, and retry policy
//! in one place.

pub mod audit;
pub mod control;
pub mod event;
pub mod feedback;
pub mod rule;
pub mod settings;
pub mod usage;

pub use audit::AuditRepo;
pub use control::ControlRepo;
pub use event::{EventFilter, EventRepo};
pub use feedback::FeedbackRepo;
pub use rule::RuleRepo;
pub use settings::SettingsRepo;
pub use usage::UsageRepo;

/// Current instant as the RFC 3339 string every table stores.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
