//! Per-user sender opt-outs.

use serde::{Deserialize, Serialize};

/// A downstream identity's opt-out of notifications from one sender.
///
/// Keyed by the composite `{user_id}_{sender}`. Created by the
/// pipeline when a user blocks a notification; the control plane only
/// lists and deletes (un-blocks) these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreference {
    /// Slack member id of the opted-out user.
    pub user_id: String,
    /// Sender address the user silenced.
    pub sender: String,
    /// Subject type pattern extracted by the pipeline, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_pattern: Option<String>,
    /// Preference kind; currently always `"silent"`.
    pub preference: String,
    /// RFC 3339, assigned by the pipeline at creation.
    pub created_at: String,
}

impl UserPreference {
    /// Composite storage key.
    pub fn key(user_id: &str, sender: &str) -> String {
        format!("{user_id}_{sender}")
    }
}
