//! Email-event repository — read-mostly access to the pipeline-owned
//! `email_events` read model.
//!
//! The filtered query deliberately names its composite index with
//! `INDEXED BY`: if the index is missing the statement fails instead of
//! silently scanning, which is what lets the resilience layer detect
//! the situation and switch to the bounded over-fetch path.

use mailgate_core::time::{day_key, parse_rfc3339, reference_offset};
use mailgate_core::types::{DecisionSource, EmailEvent, EventCategory};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{Result, StoreError};

const EVENT_COLUMNS: &str = "email_id, subject, from_email, from_domain, to_email,
    final_category, decision_source, llm_score, reason, summary,
    llm_input_tokens, llm_output_tokens, llm_cache_read_tokens, llm_cache_write_tokens,
    slack_targets, timestamp, created_at, manually_triggered, manually_blocked";

/// Receipt-time expression shared by ordering and range filters.
const RECEIPT: &str = "COALESCE(timestamp, created_at)";

/// Filter for the event read-model query.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// Only this final category.
    pub category: Option<EventCategory>,
    /// Only this `YYYY-MM-DD` day at the reference offset.
    pub date: Option<String>,
    /// Maximum rows to return.
    pub limit: usize,
}

/// Email-event repository — stateless, every method takes `&Connection`.
pub struct EventRepo;

impl EventRepo {
    /// Get one event by id.
    pub fn get(conn: &Connection, email_id: &str) -> Result<Option<EmailEvent>> {
        let row = conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM email_events WHERE email_id = ?1"),
                params![email_id],
                row_to_event,
            )
            .optional()?;
        Ok(row)
    }

    /// Indexed filtered query: category and/or day filters pushed into
    /// SQL, newest receipt first, bounded by the filter's limit.
    ///
    /// Fails with the underlying SQLite error when the named composite
    /// index does not exist — callers fall back to [`Self::recent`].
    pub fn query_filtered(conn: &Connection, filter: &EventFilter) -> Result<Vec<EmailEvent>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(category) = filter.category {
            values.push(Box::new(category.as_str().to_string()));
            clauses.push(format!("final_category = ?{}", values.len()));
        }
        if let Some(date) = &filter.date {
            let (start, end) = day_bounds(date)?;
            values.push(Box::new(start));
            clauses.push(format!("{RECEIPT} >= ?{}", values.len()));
            values.push(Box::new(end));
            clauses.push(format!("{RECEIPT} < ?{}", values.len()));
        }

        let index = if filter.category.is_some() {
            "idx_email_events_category_receipt"
        } else {
            "idx_email_events_receipt"
        };
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        values.push(Box::new(filter.limit as i64));
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM email_events INDEXED BY {index}
             {where_clause} ORDER BY {RECEIPT} DESC LIMIT ?{}",
            values.len()
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The fallback read: newest `limit` events by receipt time alone,
    /// no filters, no named index.
    pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<EmailEvent>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM email_events ORDER BY {RECEIPT} DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All events whose receipt time can fall inside the given UTC
    /// window. The bounds are padded by a day on each side so the
    /// precise (parsed) window check in the calculator stays the
    /// single source of truth.
    pub fn scan_window(
        conn: &Connection,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<EmailEvent>> {
        let lo = (start - chrono::Duration::days(1)).to_rfc3339();
        let hi = (end + chrono::Duration::days(1)).to_rfc3339();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM email_events
             WHERE {RECEIPT} >= ?1 AND {RECEIPT} < ?2 ORDER BY {RECEIPT}"
        ))?;
        let rows = stmt
            .query_map(params![lo, hi], row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Record a manual override: final category and reason change, the
    /// matching override flag is set. Returns `false` when the event
    /// does not exist.
    pub fn mark_override(
        conn: &Connection,
        email_id: &str,
        category: EventCategory,
        reason: &str,
    ) -> Result<bool> {
        let (trigger_flag, block_flag) = match category {
            EventCategory::Notify => (true, false),
            EventCategory::Silent => (false, true),
        };
        let changed = conn.execute(
            "UPDATE email_events SET
                final_category = ?1,
                reason = ?2,
                manually_triggered = CASE WHEN ?3 THEN 1 ELSE manually_triggered END,
                manually_blocked = CASE WHEN ?4 THEN 1 ELSE manually_blocked END
             WHERE email_id = ?5",
            params![category.as_str(), reason, trigger_flag, block_flag, email_id],
        )?;
        Ok(changed > 0)
    }

    /// Pipeline-parity insert (tests, seeding).
    ///
    /// Timestamps are stored UTC-normalized (`+00:00`): the SQL range
    /// filters compare RFC 3339 strings lexically, which is only
    /// chronological when every stored value shares the UTC offset.
    pub fn insert(conn: &Connection, event: &EmailEvent) -> Result<()> {
        let targets = serde_json::to_string(&event.slack_targets)?;
        let timestamp = event.timestamp.as_deref().map(normalize_utc);
        let created_at = normalize_utc(&event.created_at);
        let _ = conn.execute(
            "INSERT INTO email_events
                (email_id, subject, from_email, from_domain, to_email,
                 final_category, decision_source, llm_score, reason, summary,
                 llm_input_tokens, llm_output_tokens, llm_cache_read_tokens, llm_cache_write_tokens,
                 slack_targets, timestamp, created_at, manually_triggered, manually_blocked)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                     ?18, ?19)",
            params![
                event.email_id,
                event.subject,
                event.from_email,
                event.from_domain,
                event.to_email,
                event.final_category.as_str(),
                match event.decision_source {
                    DecisionSource::Rule => "rule",
                    DecisionSource::Llm => "llm",
                },
                event.llm_score,
                event.reason,
                event.summary,
                event.llm_input_tokens,
                event.llm_output_tokens,
                event.llm_cache_read_tokens,
                event.llm_cache_write_tokens,
                targets,
                timestamp,
                created_at,
                event.manually_triggered,
                event.manually_blocked,
            ],
        )?;
        Ok(())
    }
}

/// Rewrite a parseable RFC 3339 value into its UTC `+00:00` form;
/// unparseable values pass through untouched.
fn normalize_utc(value: &str) -> String {
    parse_rfc3339(value).map_or_else(|| value.to_string(), |dt| dt.to_rfc3339())
}

/// UTC bounds (RFC 3339, `+00:00` form) of one reference-offset day.
fn day_bounds(date: &str) -> Result<(String, String)> {
    let naive = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| StoreError::Internal(format!("invalid day key {date:?}")))?;
    let midnight = naive
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| StoreError::Internal(format!("invalid day key {date:?}")))?;
    let offset = reference_offset();
    let start = chrono::TimeZone::from_local_datetime(&offset, &midnight)
        .single()
        .ok_or_else(|| StoreError::Internal(format!("ambiguous day key {date:?}")))?
        .with_timezone(&chrono::Utc);
    let end = start + chrono::Duration::days(1);
    Ok((start.to_rfc3339(), end.to_rfc3339()))
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmailEvent> {
    let bad = |idx: usize, msg: String| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            msg.into(),
        )
    };

    let category: String = row.get(5)?;
    let final_category = EventCategory::parse(&category)
        .ok_or_else(|| bad(5, format!("unknown category {category:?}")))?;

    let source: String = row.get(6)?;
    let decision_source = match source.as_str() {
        "rule" => DecisionSource::Rule,
        "llm" => DecisionSource::Llm,
        other => return Err(bad(6, format!("unknown decision source {other:?}"))),
    };

    let targets_json: String = row.get(14)?;
    let slack_targets = serde_json::from_str(&targets_json)
        .map_err(|e| bad(14, format!("slack_targets: {e}")))?;

    Ok(EmailEvent {
        email_id: row.get(0)?,
        subject: row.get(1)?,
        from_email: row.get(2)?,
        from_domain: row.get(3)?,
        to_email: row.get(4)?,
        final_category,
        decision_source,
        llm_score: row.get(7)?,
        reason: row.get(8)?,
        summary: row.get(9)?,
        llm_input_tokens: row.get(10)?,
        llm_output_tokens: row.get(11)?,
        llm_cache_read_tokens: row.get(12)?,
        llm_cache_write_tokens: row.get(13)?,
        slack_targets,
        timestamp: row.get(15)?,
        created_at: row.get(16)?,
        manually_triggered: row.get(17)?,
        manually_blocked: row.get(18)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
