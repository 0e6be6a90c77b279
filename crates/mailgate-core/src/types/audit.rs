//! Append-only audit trail entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What kind of administrative mutation an audit entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Routing rule created.
    Create,
    /// Routing rule updated.
    Update,
    /// Routing rule deleted.
    Delete,
    /// System settings document changed.
    SettingsUpdate,
    /// System paused.
    SystemPause,
    /// System resumed.
    SystemResume,
    /// Daily limits changed.
    SystemLimits,
    /// Batch run triggered against the pipeline.
    BatchTrigger,
    /// Manual per-message trigger/block override.
    NotifyOverride,
    /// User opt-out preference removed.
    PreferenceDelete,
}

impl AuditAction {
    /// Stable storage string (matches the serde rename).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::SettingsUpdate => "SETTINGS_UPDATE",
            Self::SystemPause => "SYSTEM_PAUSE",
            Self::SystemResume => "SYSTEM_RESUME",
            Self::SystemLimits => "SYSTEM_LIMITS",
            Self::BatchTrigger => "BATCH_TRIGGER",
            Self::NotifyOverride => "NOTIFY_OVERRIDE",
            Self::PreferenceDelete => "PREFERENCE_DELETE",
        }
    }

    /// Parse the storage string back into an action.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            "SETTINGS_UPDATE" => Some(Self::SettingsUpdate),
            "SYSTEM_PAUSE" => Some(Self::SystemPause),
            "SYSTEM_RESUME" => Some(Self::SystemResume),
            "SYSTEM_LIMITS" => Some(Self::SystemLimits),
            "BATCH_TRIGGER" => Some(Self::BatchTrigger),
            "NOTIFY_OVERRIDE" => Some(Self::NotifyOverride),
            "PREFERENCE_DELETE" => Some(Self::PreferenceDelete),
            _ => None,
        }
    }
}

/// One immutable audit record. Written once, read many; there is no
/// update or delete operation anywhere in the public contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// UUID v7 — time-ordered.
    pub id: String,
    /// Actor identity (token name bound to the session).
    pub actor: String,
    /// Action kind.
    pub action: AuditAction,
    /// Target identifier (rule id, email id, preference key…).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Snapshot of the record before the mutation (absent for create).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    /// Snapshot after the mutation (absent for delete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
    /// RFC 3339, server-assigned.
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_storage_string() {
        for action in [
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Delete,
            AuditAction::SettingsUpdate,
            AuditAction::SystemPause,
            AuditAction::SystemResume,
            AuditAction::SystemLimits,
            AuditAction::BatchTrigger,
            AuditAction::NotifyOverride,
            AuditAction::PreferenceDelete,
        ] {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(AuditAction::parse("NOPE"), None);
    }
}
