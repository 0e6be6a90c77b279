//! Input validation and normalization.
//!
//! Everything here runs before any write touches the store — malformed
//! input is rejected as [`CoreError::Validation`] and never persisted.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{CoreError, Result};

/// Slack member ids: `U`/`W` prefix followed by 4–12 uppercase
/// alphanumerics.
const SLACK_ID_PATTERN: &str = "^[UW][A-Z0-9]{4,12}$";

fn slack_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SLACK_ID_PATTERN).expect("slack id pattern is valid"))
}

/// Validate a routing-rule identifier.
pub fn validate_slack_user_id(id: &str) -> Result<()> {
    if slack_id_regex().is_match(id) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "invalid slack user id {id:?}: must match {SLACK_ID_PATTERN}"
        )))
    }
}

/// Normalize an address list: trim, lower-case, drop empties,
/// de-duplicate preserving first occurrence.
pub fn normalize_addresses(addresses: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(addresses.len());
    for raw in addresses {
        let addr = raw.trim().to_lowercase();
        if addr.is_empty() {
            continue;
        }
        if seen.insert(addr.clone()) {
            out.push(addr);
        }
    }
    out
}

/// Normalize a string set (domains, keywords): same rules as addresses.
pub fn normalize_string_set(values: &[String]) -> Vec<String> {
    normalize_addresses(values)
}

/// Validate a positive limit value.
pub fn validate_positive_i64(value: i64, field: &str) -> Result<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be positive, got {value}"
        )))
    }
}

/// Validate a positive cost/limit figure.
pub fn validate_positive_f64(value: f64, field: &str) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be a positive number, got {value}"
        )))
    }
}

/// Validate a unit-interval score threshold.
pub fn validate_unit_interval(value: f64, field: &str) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be within [0, 1], got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_slack_member_ids() {
        assert!(validate_slack_user_id("U0123ABCD").is_ok());
        assert!(validate_slack_user_id("W99ZZ").is_ok());
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["", "u0123abcd", "X0123ABCD", "U01", "U0123ABCD0123ABCD"] {
            assert!(validate_slack_user_id(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn normalization_trims_lowers_and_dedups() {
        let input = vec![
            "  Ops@Hotseller.co.kr ".to_string(),
            "ops@hotseller.co.kr".to_string(),
            "".to_string(),
            "DEV@hotseller.co.kr".to_string(),
        ];
        assert_eq!(
            normalize_addresses(&input),
            vec!["ops@hotseller.co.kr", "dev@hotseller.co.kr"]
        );
    }

    #[test]
    fn positive_checks() {
        assert!(validate_positive_i64(1, "calls").is_ok());
        assert!(validate_positive_i64(0, "calls").is_err());
        assert!(validate_positive_f64(0.01, "cost").is_ok());
        assert!(validate_positive_f64(-1.0, "cost").is_err());
        assert!(validate_positive_f64(f64::NAN, "cost").is_err());
        assert!(validate_unit_interval(0.5, "threshold").is_ok());
        assert!(validate_unit_interval(1.5, "threshold").is_err());
    }
}
