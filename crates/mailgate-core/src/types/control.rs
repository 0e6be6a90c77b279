//! Global system control state and daily usage records.

use serde::{Deserialize, Serialize};

/// Default daily call-count limit.
pub const DEFAULT_DAILY_LIMIT_CALLS: i64 = 1000;
/// Default daily cost limit (USD).
pub const DEFAULT_DAILY_LIMIT_COST_USD: f64 = 5.0;

/// The singleton run/pause switch plus advisory budget figures.
///
/// Stored as the well-known `system_control/status` document and
/// materialized with defaults on first read. The pause metadata fields
/// are all-or-nothing: populated together on pause, cleared together
/// on resume.
///
/// The daily limits are advisory — rendered for humans, never enforced
/// by the control plane itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemControlState {
    /// `false` while paused.
    pub enabled: bool,
    /// RFC 3339 pause instant; present only while paused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<String>,
    /// Actor who paused; present only while paused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_by: Option<String>,
    /// Free-text reason; present only while paused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
    /// Advisory daily call-count limit.
    pub daily_limit_calls: i64,
    /// Advisory daily cost limit in USD.
    pub daily_limit_cost_usd: f64,
    /// RFC 3339 instant of the last externally-triggered batch run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_batch_at: Option<String>,
    /// Message count reported by the last batch run.
    pub last_batch_processed: i64,
}

impl Default for SystemControlState {
    fn default() -> Self {
        Self {
            enabled: true,
            paused_at: None,
            paused_by: None,
            pause_reason: None,
            daily_limit_calls: DEFAULT_DAILY_LIMIT_CALLS,
            daily_limit_cost_usd: DEFAULT_DAILY_LIMIT_COST_USD,
            last_batch_at: None,
            last_batch_processed: 0,
        }
    }
}

impl SystemControlState {
    /// INVARIANT: pause metadata is never partially populated.
    pub fn pause_metadata_consistent(&self) -> bool {
        let present = [
            self.paused_at.is_some(),
            self.paused_by.is_some(),
            self.pause_reason.is_some(),
        ];
        present.iter().all(|p| *p) || present.iter().all(|p| !*p)
    }
}

/// One calendar day of metered-resource consumption, keyed by the
/// `YYYY-MM-DD` date at the reference offset.
///
/// Written by the external pipeline; the control plane only reads it
/// to render budget consumption, and substitutes zeros when absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsageRecord {
    /// `YYYY-MM-DD` at the reference offset.
    pub date: String,
    /// LLM calls made.
    pub calls: i64,
    /// Accumulated cost in USD.
    pub cost_usd: f64,
    /// Input tokens consumed.
    pub input_tokens: i64,
    /// Output tokens produced.
    pub output_tokens: i64,
}

impl DailyUsageRecord {
    /// Zero-valued record for a date with no usage yet.
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }
}

/// Read-only composite returned by the status endpoint: the control
/// state merged with today's usage.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// Current control state (defaults if never written).
    #[serde(flatten)]
    pub control: SystemControlState,
    /// Today's usage at the reference offset (zeros if absent).
    pub today: DailyUsageRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_budget() {
        let state = SystemControlState::default();
        assert!(state.enabled);
        assert_eq!(state.daily_limit_calls, 1000);
        assert!((state.daily_limit_cost_usd - 5.0).abs() < f64::EPSILON);
        assert!(state.pause_metadata_consistent());
    }

    #[test]
    fn partial_pause_metadata_is_inconsistent() {
        let state = SystemControlState {
            paused_at: Some("2025-06-01T00:00:00Z".into()),
            ..SystemControlState::default()
        };
        assert!(!state.pause_metadata_consistent());
    }
}
