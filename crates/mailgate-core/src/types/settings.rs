//! Tunable policy settings consumed by the external pipeline.

use serde::{Deserialize, Serialize};

/// Default notification score threshold.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;
/// Default pipeline-side configuration cache TTL (seconds).
pub const DEFAULT_ROUTING_CACHE_TTL_SEC: i64 = 60;

/// The singleton `system_settings/general` document.
///
/// Defaults live in code and are returned transparently when the
/// document has never been written, so the pipeline never sees an
/// absent-configuration error. The four string-set fields are stored
/// normalized (trimmed, lower-cased, de-duplicated).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemSettings {
    /// Minimum model score for a `notify` decision.
    pub score_threshold: f64,
    /// Pipeline configuration cache TTL in seconds.
    pub routing_cache_ttl_sec: i64,
    /// Sender domains always silenced.
    pub blacklist_domains: Vec<String>,
    /// Sender domains always notified.
    pub whitelist_domains: Vec<String>,
    /// Subject keywords that mark a message as spam.
    pub spam_keywords: Vec<String>,
    /// Subject keywords that mark a message as urgent.
    pub urgent_keywords: Vec<String>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            routing_cache_ttl_sec: DEFAULT_ROUTING_CACHE_TTL_SEC,
            blacklist_domains: Vec::new(),
            whitelist_domains: Vec::new(),
            spam_keywords: Vec::new(),
            urgent_keywords: Vec::new(),
        }
    }
}

/// Partial update for [`SystemSettings`]; `None` fields are untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsUpdate {
    /// New score threshold (must be within `[0, 1]`).
    pub score_threshold: Option<f64>,
    /// New cache TTL in seconds (must be positive).
    pub routing_cache_ttl_sec: Option<i64>,
    /// Replacement blacklist.
    pub blacklist_domains: Option<Vec<String>>,
    /// Replacement whitelist.
    pub whitelist_domains: Option<Vec<String>>,
    /// Replacement spam keyword set.
    pub spam_keywords: Option<Vec<String>>,
    /// Replacement urgent keyword set.
    pub urgent_keywords: Option<Vec<String>>,
}

impl SettingsUpdate {
    /// `true` when no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.score_threshold.is_none()
            && self.routing_cache_ttl_sec.is_none()
            && self.blacklist_domains.is_none()
            && self.whitelist_domains.is_none()
            && self.spam_keywords.is_none()
            && self.urgent_keywords.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings: SystemSettings =
            serde_json::from_str(r#"{"scoreThreshold": 0.7}"#).unwrap();
        assert!((settings.score_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(settings.routing_cache_ttl_sec, 60);
        assert!(settings.blacklist_domains.is_empty());
    }
}
