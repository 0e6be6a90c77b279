//! Email event read-model (pipeline-owned, read-mostly here).

use serde::{Deserialize, Serialize};

/// Final routing decision for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Notification was (or should be) sent.
    Notify,
    /// Message was silenced.
    Silent,
}

impl EventCategory {
    /// Stable storage string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::Silent => "silent",
        }
    }

    /// Parse the storage string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "notify" => Some(Self::Notify),
            "silent" => Some(Self::Silent),
            _ => None,
        }
    }
}

/// What produced the final decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    /// A deterministic rule decided without a model call.
    Rule,
    /// The model's score decided.
    Llm,
}

/// One inbound message evaluated by the pipeline.
///
/// Token counters are present only when a model call actually
/// happened. `timestamp` is the message receipt time and `created_at`
/// the record creation time; they diverge for backfilled data, and day
/// bucketing prefers `timestamp` with `created_at` as the fallback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailEvent {
    /// Stable message identifier.
    pub email_id: String,
    /// Subject line (truncated by the pipeline at write time).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Sender address.
    pub from_email: String,
    /// Sender domain.
    pub from_domain: String,
    /// Monitored recipient address.
    pub to_email: String,
    /// Final category.
    pub final_category: EventCategory,
    /// Decision source tag.
    pub decision_source: DecisionSource,
    /// Raw model score, when a model call occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_score: Option<f64>,
    /// Human-readable decision reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Model-produced summary, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Input tokens for the model call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_input_tokens: Option<i64>,
    /// Output tokens for the model call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_output_tokens: Option<i64>,
    /// Prompt-cache read tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_cache_read_tokens: Option<i64>,
    /// Prompt-cache write tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_cache_write_tokens: Option<i64>,
    /// Slack identities notified.
    pub slack_targets: Vec<String>,
    /// RFC 3339 message receipt time, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// RFC 3339 record creation time.
    pub created_at: String,
    /// Set when an admin force-sent this notification.
    #[serde(default)]
    pub manually_triggered: bool,
    /// Set when an admin silenced this notification.
    #[serde(default)]
    pub manually_blocked: bool,
}

impl EmailEvent {
    /// The instant used for day bucketing: receipt time when present,
    /// otherwise record creation time.
    pub fn bucket_instant(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.timestamp
            .as_deref()
            .and_then(crate::time::parse_rfc3339)
            .or_else(|| crate::time::parse_rfc3339(&self.created_at))
    }

    /// A record counts as a metered call only when it carries positive
    /// input or output token counts.
    pub fn is_metered_call(&self) -> bool {
        self.llm_input_tokens.unwrap_or(0) > 0 || self.llm_output_tokens.unwrap_or(0) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> EmailEvent {
        EmailEvent {
            email_id: "msg-1".into(),
            subject: Some("Invoice".into()),
            from_email: "billing@vendor.com".into(),
            from_domain: "vendor.com".into(),
            to_email: "ops@hotseller.co.kr".into(),
            final_category: EventCategory::Notify,
            decision_source: DecisionSource::Llm,
            llm_score: Some(0.91),
            reason: None,
            summary: None,
            llm_input_tokens: None,
            llm_output_tokens: None,
            llm_cache_read_tokens: None,
            llm_cache_write_tokens: None,
            slack_targets: vec!["U0001AAAA".into()],
            timestamp: None,
            created_at: "2025-01-31T10:00:00Z".into(),
            manually_triggered: false,
            manually_blocked: false,
        }
    }

    #[test]
    fn bucket_instant_prefers_receipt_timestamp() {
        let mut ev = event();
        ev.timestamp = Some("2025-01-30T00:00:00Z".into());
        assert_eq!(
            ev.bucket_instant().unwrap().to_rfc3339(),
            "2025-01-30T00:00:00+00:00"
        );

        ev.timestamp = None;
        assert_eq!(
            ev.bucket_instant().unwrap().to_rfc3339(),
            "2025-01-31T10:00:00+00:00"
        );
    }

    #[test]
    fn metered_call_requires_positive_tokens() {
        let mut ev = event();
        assert!(!ev.is_metered_call());
        ev.llm_input_tokens = Some(0);
        assert!(!ev.is_metered_call());
        ev.llm_output_tokens = Some(12);
        assert!(ev.is_metered_call());
    }
}
