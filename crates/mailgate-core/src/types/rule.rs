//! Routing rules — who gets notified for which mailboxes.

use serde::{Deserialize, Serialize};

/// A routing rule: maps a Slack identity to the set of Gmail accounts
/// it should receive alerts for.
///
/// The `slack_user_id` is the immutable primary key. `gmail_accounts`
/// is always stored normalized (trimmed, lower-cased, de-duplicated);
/// an empty list is allowed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    /// Slack member id (`U…`/`W…`). Immutable.
    pub slack_user_id: String,
    /// Optional human-readable name for the admin console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Normalized Gmail addresses this identity is subscribed to.
    pub gmail_accounts: Vec<String>,
    /// Disabled rules are ignored by the pipeline's configuration pull.
    pub enabled: bool,
    /// RFC 3339, server-assigned at create.
    pub created_at: String,
    /// RFC 3339, server-assigned on every mutation.
    pub updated_at: String,
    /// Actor who last modified the rule.
    pub updated_by: String,
}

/// Partial update for a routing rule. `None` fields are left untouched;
/// this is the field granularity of the store's merge semantics.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleUpdate {
    /// New display name (`Some(None)` is not representable — the name
    /// is replaced, never cleared, matching the admin console).
    pub display_name: Option<String>,
    /// Replacement address set; re-normalized before persistence.
    pub gmail_accounts: Option<Vec<String>>,
    /// New enabled flag.
    pub enabled: Option<bool>,
}

impl RuleUpdate {
    /// `true` when no field is supplied — a no-op update.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.gmail_accounts.is_none() && self.enabled.is_none()
    }
}
