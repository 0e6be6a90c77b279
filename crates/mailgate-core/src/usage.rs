//! Usage ledger aggregation and cost accounting.
//!
//! The monthly report scans raw [`EmailEvent`] records, keeps the ones
//! that represent an actual metered model call, buckets them by day at
//! the reference offset, and derives cost from per-category unit
//! prices. Accumulation happens at full precision; rounding to the
//! nearest cent / whole won is applied only when the report is built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::time::{day_key, month_window};
use crate::types::EmailEvent;

/// Per-1M-token unit prices plus the secondary-currency exchange rate.
///
/// External configuration, not derived data. Defaults track the
/// Haiku-class model the pipeline calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenPricing {
    /// USD per 1M input tokens.
    pub input_per_mtok: f64,
    /// USD per 1M output tokens.
    pub output_per_mtok: f64,
    /// USD per 1M cache-read tokens.
    pub cache_read_per_mtok: f64,
    /// USD per 1M cache-write tokens.
    pub cache_write_per_mtok: f64,
    /// KRW per USD.
    pub usd_to_krw: f64,
}

impl Default for TokenPricing {
    fn default() -> Self {
        Self {
            input_per_mtok: 0.80,
            output_per_mtok: 4.00,
            cache_read_per_mtok: 0.08,
            cache_write_per_mtok: 1.00,
            usd_to_krw: 1400.0,
        }
    }
}

impl TokenPricing {
    /// Full-precision USD cost for one set of token counters.
    pub fn cost_usd(
        &self,
        input: i64,
        output: i64,
        cache_read: i64,
        cache_write: i64,
    ) -> f64 {
        per_mtok(input, self.input_per_mtok)
            + per_mtok(output, self.output_per_mtok)
            + per_mtok(cache_read, self.cache_read_per_mtok)
            + per_mtok(cache_write, self.cache_write_per_mtok)
    }
}

fn per_mtok(tokens: i64, unit_price: f64) -> f64 {
    tokens as f64 / 1_000_000.0 * unit_price
}

/// One day's slice of the monthly report, keyed ascending.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBreakdown {
    /// `YYYY-MM-DD` at the reference offset.
    pub date: String,
    /// Metered calls that day.
    pub calls: i64,
    /// Input tokens.
    pub input_tokens: i64,
    /// Output tokens.
    pub output_tokens: i64,
    /// USD cost for the day, rounded to cents.
    pub cost_usd: f64,
}

/// Aggregated month of metered usage.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    /// `YYYY-MM` the report covers.
    pub month: String,
    /// Total metered calls.
    pub calls: i64,
    /// Total input tokens.
    pub input_tokens: i64,
    /// Total output tokens.
    pub output_tokens: i64,
    /// Total cache-read tokens.
    pub cache_read_tokens: i64,
    /// Total cache-write tokens.
    pub cache_write_tokens: i64,
    /// Total cost in USD, rounded to cents.
    pub cost_usd: f64,
    /// Total cost in KRW, rounded to whole won.
    pub cost_krw: f64,
    /// `cacheRead / (input + cacheRead) * 100`; 0 when the denominator
    /// is 0.
    pub cache_hit_rate: f64,
    /// Per-day breakdown, ascending by date.
    pub days: Vec<DailyBreakdown>,
}

/// Round USD to the nearest cent.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round KRW to the nearest whole won.
pub fn round_won(value: f64) -> f64 {
    value.round()
}

/// Build the monthly report for `year_month` (`YYYY-MM`) from raw
/// event records.
///
/// Events outside the `[monthStart, monthEnd)` window at the reference
/// offset are skipped, as are records without positive input/output
/// token counters (rule-decided messages that never hit the model).
pub fn monthly_report(
    events: &[EmailEvent],
    year_month: &str,
    pricing: &TokenPricing,
) -> Result<MonthlyReport> {
    let (start, end) = month_window(year_month)?;

    let mut calls = 0i64;
    let mut input = 0i64;
    let mut output = 0i64;
    let mut cache_read = 0i64;
    let mut cache_write = 0i64;
    // BTreeMap keeps the per-day breakdown sorted ascending for free.
    let mut days: BTreeMap<String, (i64, i64, i64, f64)> = BTreeMap::new();

    for event in events {
        if !event.is_metered_call() {
            continue;
        }
        let Some(instant) = event.bucket_instant() else {
            continue;
        };
        if instant < start || instant >= end {
            continue;
        }

        let ev_input = event.llm_input_tokens.unwrap_or(0);
        let ev_output = event.llm_output_tokens.unwrap_or(0);
        let ev_cache_read = event.llm_cache_read_tokens.unwrap_or(0);
        let ev_cache_write = event.llm_cache_write_tokens.unwrap_or(0);
        let ev_cost = pricing.cost_usd(ev_input, ev_output, ev_cache_read, ev_cache_write);

        calls += 1;
        input += ev_input;
        output += ev_output;
        cache_read += ev_cache_read;
        cache_write += ev_cache_write;

        let day = days.entry(day_key(instant)).or_insert((0, 0, 0, 0.0));
        day.0 += 1;
        day.1 += ev_input;
        day.2 += ev_output;
        day.3 += ev_cost;
    }

    let total_usd = pricing.cost_usd(input, output, cache_read, cache_write);
    let denominator = input + cache_read;
    let cache_hit_rate = if denominator > 0 {
        cache_read as f64 / denominator as f64 * 100.0
    } else {
        0.0
    };

    Ok(MonthlyReport {
        month: year_month.to_string(),
        calls,
        input_tokens: input,
        output_tokens: output,
        cache_read_tokens: cache_read,
        cache_write_tokens: cache_write,
        cost_usd: round_cents(total_usd),
        cost_krw: round_won(total_usd * pricing.usd_to_krw),
        cache_hit_rate,
        days: days
            .into_iter()
            .map(|(date, (calls, input_tokens, output_tokens, cost))| DailyBreakdown {
                date,
                calls,
                input_tokens,
                output_tokens,
                cost_usd: round_cents(cost),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DecisionSource, EventCategory};

    fn metered_event(id: &str, timestamp: &str, input: i64, output: i64) -> EmailEvent {
        EmailEvent {
            email_id: id.into(),
            subject: None,
            from_email: "billing@vendor.com".into(),
            from_domain: "vendor.com".into(),
            to_email: "ops@hotseller.co.kr".into(),
            final_category: EventCategory::Notify,
            decision_source: DecisionSource::Llm,
            llm_score: Some(0.8),
            reason: None,
            summary: None,
            llm_input_tokens: Some(input),
            llm_output_tokens: Some(output),
            llm_cache_read_tokens: None,
            llm_cache_write_tokens: None,
            slack_targets: vec![],
            timestamp: Some(timestamp.into()),
            created_at: timestamp.into(),
            manually_triggered: false,
            manually_blocked: false,
        }
    }

    #[test]
    fn documented_cost_fixture() {
        // 2M input @ $0.80/1M + 0.5M output @ $4.00/1M = $1.60 + $2.00.
        let events = vec![
            metered_event("a", "2025-03-05T03:00:00Z", 1_500_000, 400_000),
            metered_event("b", "2025-03-10T03:00:00Z", 500_000, 100_000),
        ];
        let pricing = TokenPricing::default();
        let report = monthly_report(&events, "2025-03", &pricing).unwrap();

        assert_eq!(report.calls, 2);
        assert_eq!(report.input_tokens, 2_000_000);
        assert_eq!(report.output_tokens, 500_000);
        assert!((report.cost_usd - 3.60).abs() < 1e-9);
        assert!((report.cost_krw - round_won(3.60 * 1400.0)).abs() < 1e-9);
        assert!((report.cache_hit_rate - 0.0).abs() < f64::EPSILON);
        assert_eq!(report.days.len(), 2);
        assert_eq!(report.days[0].date, "2025-03-05");
        assert_eq!(report.days[1].date, "2025-03-10");
    }

    #[test]
    fn unmetered_events_are_not_calls() {
        let mut rule_only = metered_event("c", "2025-03-05T03:00:00Z", 0, 0);
        rule_only.llm_input_tokens = None;
        rule_only.llm_output_tokens = None;
        rule_only.decision_source = DecisionSource::Rule;

        let report =
            monthly_report(&[rule_only], "2025-03", &TokenPricing::default()).unwrap();
        assert_eq!(report.calls, 0);
        assert!(report.days.is_empty());
    }

    #[test]
    fn window_edges_respect_reference_offset() {
        // 15:00 UTC Feb 28 is 00:00 KST Mar 1 — first instant of March.
        let inside = metered_event("d", "2025-02-28T15:00:00Z", 10, 10);
        // 14:59 UTC Feb 28 is still February.
        let outside = metered_event("e", "2025-02-28T14:59:00Z", 10, 10);

        let report = monthly_report(
            &[inside, outside],
            "2025-03",
            &TokenPricing::default(),
        )
        .unwrap();
        assert_eq!(report.calls, 1);
        assert_eq!(report.days[0].date, "2025-03-01");
    }

    #[test]
    fn cache_hit_rate_uses_read_over_input_plus_read() {
        let mut ev = metered_event("f", "2025-03-05T03:00:00Z", 750_000, 0);
        ev.llm_cache_read_tokens = Some(250_000);
        let report = monthly_report(&[ev], "2025-03", &TokenPricing::default()).unwrap();
        assert!((report.cache_hit_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_created_at_when_timestamp_absent() {
        let mut ev = metered_event("g", "2025-03-05T03:00:00Z", 10, 10);
        ev.timestamp = None;
        ev.created_at = "2025-03-07T03:00:00Z".into();
        let report = monthly_report(&[ev], "2025-03", &TokenPricing::default()).unwrap();
        assert_eq!(report.days[0].date, "2025-03-07");
    }
}
