//! High-level [`ControlStore`] — the control-plane contracts on top of
//! the per-collection repositories.
//!
//! Writes are serialized through an in-process lock and retried on
//! SQLITE_BUSY; each primary write is a single statement, so callers
//! never observe partial documents. The audit append that follows a
//! successful mutation is deliberately a second, independent operation:
//! if it fails, the failure is logged and swallowed — the primary
//! record takes precedence over completeness of the audit trail, and a
//! crash between the two can lose an audit entry (documented gap, not
//! retried).

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use mailgate_core::errors::{CoreError, Result};
use mailgate_core::time::{month_window, today_key};
use mailgate_core::types::{
    AuditAction, AuditLogEntry, DailyUsageRecord, EmailEvent, EventCategory, RoutingRule,
    RuleUpdate, SettingsUpdate, SystemControlState, SystemSettings, SystemStatus, UserPreference,
};
use mailgate_core::usage::{MonthlyReport, TokenPricing, monthly_report};
use mailgate_core::validate;

use crate::connection::{ConnectionPool, PooledConnection, open_pool};
use crate::errors::StoreError;
use crate::repositories::{
    AuditRepo, ControlRepo, EventFilter, EventRepo, FeedbackRepo, RuleRepo, SettingsRepo,
    UsageRepo, now_rfc3339,
};

/// Over-fetch bound for the degraded event query path.
pub const FALLBACK_SCAN_LIMIT: usize = 500;

/// High-level store wrapping the connection pool and all repositories.
pub struct ControlStore {
    pool: ConnectionPool,
    write_lock: Mutex<()>,
}

impl ControlStore {
    const SQLITE_BUSY_MAX_RETRIES: u32 = 16;

    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let pool = open_pool(path).map_err(CoreError::from)?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool (tests, custom pooling).
    pub fn from_pool(pool: ConnectionPool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Direct pool access for callers that need raw repository reads.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn conn(&self) -> std::result::Result<PooledConnection, StoreError> {
        Ok(self.pool.get()?)
    }

    fn lock_writes(&self) -> std::result::Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Internal("write lock poisoned".into()))
    }

    /// Retry an operation on SQLITE_BUSY/LOCKED with linear backoff.
    fn retry_on_sqlite_busy<T>(
        mut f: impl FnMut() -> std::result::Result<T, StoreError>,
    ) -> std::result::Result<T, StoreError> {
        let mut attempts = 0;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_busy() && attempts < Self::SQLITE_BUSY_MAX_RETRIES => {
                    attempts += 1;
                    let backoff = Duration::from_millis(u64::from(attempts.min(50)) * 10);
                    std::thread::sleep(backoff);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn with_write<T>(
        &self,
        f: impl FnMut() -> std::result::Result<T, StoreError>,
    ) -> std::result::Result<T, StoreError> {
        let _guard = self.lock_writes()?;
        Self::retry_on_sqlite_busy(f)
    }

    // ─────────────────────────────────────────────────────────────────
    // Audit trail
    // ─────────────────────────────────────────────────────────────────

    fn new_audit_entry(
        actor: &str,
        action: AuditAction,
        target: Option<&str>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> AuditLogEntry {
        AuditLogEntry {
            id: format!("al_{}", Uuid::now_v7()),
            actor: actor.to_string(),
            action,
            target: target.map(String::from),
            before,
            after,
            timestamp: now_rfc3339(),
        }
    }

    /// Append an audit entry; the only failure is `StoreUnavailable`.
    pub fn append_audit(&self, entry: &AuditLogEntry) -> Result<()> {
        self.with_write(|| {
            let conn = self.conn()?;
            AuditRepo::append(&conn, entry)
        })
        .map_err(CoreError::from)
    }

    /// Best-effort audit append: a failure here must never fail the
    /// primary operation that already succeeded.
    pub fn audit_best_effort(
        &self,
        actor: &str,
        action: AuditAction,
        target: Option<&str>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) {
        let entry = Self::new_audit_entry(actor, action, target, before, after);
        if let Err(err) = self.append_audit(&entry) {
            tracing::warn!(
                action = action.as_str(),
                target = target.unwrap_or(""),
                error = %err,
                "audit append failed after successful primary write"
            );
        }
    }

    /// Newest-first audit listing. The HTTP boundary defaults the
    /// limit to 200; nothing is enforced here — callers bound
    /// themselves.
    pub fn recent_audit(&self, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let conn = self.conn().map_err(CoreError::from)?;
        AuditRepo::recent(&conn, limit).map_err(CoreError::from)
    }

    /// Audit entries for one target id, newest first.
    pub fn audit_for_target(&self, target: &str, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let conn = self.conn().map_err(CoreError::from)?;
        AuditRepo::for_target(&conn, target, limit).map_err(CoreError::from)
    }

    // ─────────────────────────────────────────────────────────────────
    // Rule store
    // ─────────────────────────────────────────────────────────────────

    /// All rules, most recently modified first.
    pub fn list_rules(&self) -> Result<Vec<RoutingRule>> {
        let conn = self.conn().map_err(CoreError::from)?;
        RuleRepo::list(&conn).map_err(CoreError::from)
    }

    /// One rule, or `NotFound`.
    pub fn get_rule(&self, slack_user_id: &str) -> Result<RoutingRule> {
        let conn = self.conn().map_err(CoreError::from)?;
        RuleRepo::get(&conn, slack_user_id)
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::NotFound(format!("rule {slack_user_id}")))
    }

    /// Create a rule. Fails `Validation` on a malformed id,
    /// `Conflict` when the id already exists. Addresses are normalized
    /// before persistence.
    pub fn create_rule(
        &self,
        actor: &str,
        slack_user_id: &str,
        display_name: Option<String>,
        gmail_accounts: &[String],
        enabled: bool,
    ) -> Result<RoutingRule> {
        validate::validate_slack_user_id(slack_user_id)?;
        let now = now_rfc3339();
        let rule = RoutingRule {
            slack_user_id: slack_user_id.to_string(),
            display_name,
            gmail_accounts: validate::normalize_addresses(gmail_accounts),
            enabled,
            created_at: now.clone(),
            updated_at: now,
            updated_by: actor.to_string(),
        };

        self.with_write(|| {
            let conn = self.conn()?;
            if RuleRepo::exists(&conn, slack_user_id)? {
                return Err(StoreError::Conflict(format!(
                    "rule {slack_user_id} already exists"
                )));
            }
            RuleRepo::insert(&conn, &rule)
        })
        .map_err(CoreError::from)?;

        self.audit_best_effort(
            actor,
            AuditAction::Create,
            Some(slack_user_id),
            None,
            serde_json::to_value(&rule).ok(),
        );
        tracing::info!(rule = slack_user_id, actor, "routing rule created");
        Ok(rule)
    }

    /// Apply a partial update. Fails `NotFound` when absent; supplied
    /// addresses are re-normalized.
    pub fn update_rule(
        &self,
        actor: &str,
        slack_user_id: &str,
        mut update: RuleUpdate,
    ) -> Result<RoutingRule> {
        if update.is_empty() {
            return Err(CoreError::Validation("no rule fields supplied".into()));
        }
        if let Some(accounts) = update.gmail_accounts.take() {
            update.gmail_accounts = Some(validate::normalize_addresses(&accounts));
        }

        let before = self.get_rule(slack_user_id)?;
        let now = now_rfc3339();
        let changed = self
            .with_write(|| {
                let conn = self.conn()?;
                RuleRepo::update(&conn, slack_user_id, &update, actor, &now)
            })
            .map_err(CoreError::from)?;
        if !changed {
            // Deleted between the read and the write.
            return Err(CoreError::NotFound(format!("rule {slack_user_id}")));
        }

        let after = self.get_rule(slack_user_id)?;
        self.audit_best_effort(
            actor,
            AuditAction::Update,
            Some(slack_user_id),
            serde_json::to_value(&before).ok(),
            serde_json::to_value(&after).ok(),
        );
        Ok(after)
    }

    /// Hard delete. Fails `NotFound` when absent; the audit entry
    /// captures the pre-delete state.
    pub fn delete_rule(&self, actor: &str, slack_user_id: &str) -> Result<()> {
        let before = self.get_rule(slack_user_id)?;
        let deleted = self
            .with_write(|| {
                let conn = self.conn()?;
                RuleRepo::delete(&conn, slack_user_id)
            })
            .map_err(CoreError::from)?;
        if !deleted {
            return Err(CoreError::NotFound(format!("rule {slack_user_id}")));
        }

        self.audit_best_effort(
            actor,
            AuditAction::Delete,
            Some(slack_user_id),
            serde_json::to_value(&before).ok(),
            None,
        );
        tracing::info!(rule = slack_user_id, actor, "routing rule deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // System control
    // ─────────────────────────────────────────────────────────────────

    fn control_state(&self) -> Result<SystemControlState> {
        let conn = self.conn().map_err(CoreError::from)?;
        Ok(ControlRepo::get(&conn)
            .map_err(CoreError::from)?
            .unwrap_or_default())
    }

    /// Control state merged with today's usage (zeros when absent).
    pub fn system_status(&self) -> Result<SystemStatus> {
        let control = self.control_state()?;
        let today = today_key();
        let conn = self.conn().map_err(CoreError::from)?;
        let usage = UsageRepo::get(&conn, &today)
            .map_err(CoreError::from)?
            .unwrap_or_else(|| DailyUsageRecord::empty(today));
        Ok(SystemStatus {
            control,
            today: usage,
        })
    }

    /// Pause the system. Idempotent: pausing an already-paused system
    /// overwrites the metadata.
    pub fn pause(&self, actor: &str, reason: &str) -> Result<SystemControlState> {
        let before = self.control_state()?;
        let now = now_rfc3339();
        self.with_write(|| {
            let conn = self.conn()?;
            ControlRepo::pause(&conn, actor, reason, &now)
        })
        .map_err(CoreError::from)?;

        let after = self.control_state()?;
        self.audit_best_effort(
            actor,
            AuditAction::SystemPause,
            None,
            serde_json::to_value(&before).ok(),
            serde_json::to_value(&after).ok(),
        );
        tracing::warn!(actor, reason, "system paused");
        Ok(after)
    }

    /// Resume the system, clearing all pause metadata together.
    pub fn resume(&self, actor: &str) -> Result<SystemControlState> {
        let before = self.control_state()?;
        let now = now_rfc3339();
        self.with_write(|| {
            let conn = self.conn()?;
            ControlRepo::resume(&conn, &now)
        })
        .map_err(CoreError::from)?;

        let after = self.control_state()?;
        self.audit_best_effort(
            actor,
            AuditAction::SystemResume,
            None,
            serde_json::to_value(&before).ok(),
            serde_json::to_value(&after).ok(),
        );
        tracing::info!(actor, "system resumed");
        Ok(after)
    }

    /// Update only the supplied daily limits. Both must be positive
    /// when supplied; supplying neither is a validation error.
    pub fn set_limits(
        &self,
        actor: &str,
        daily_limit_calls: Option<i64>,
        daily_limit_cost_usd: Option<f64>,
    ) -> Result<SystemControlState> {
        if daily_limit_calls.is_none() && daily_limit_cost_usd.is_none() {
            return Err(CoreError::Validation("no limit fields supplied".into()));
        }
        if let Some(calls) = daily_limit_calls {
            validate::validate_positive_i64(calls, "dailyLimitCalls")?;
        }
        if let Some(cost) = daily_limit_cost_usd {
            validate::validate_positive_f64(cost, "dailyLimitCostUsd")?;
        }

        let before = self.control_state()?;
        let now = now_rfc3339();
        self.with_write(|| {
            let conn = self.conn()?;
            ControlRepo::set_limits(&conn, daily_limit_calls, daily_limit_cost_usd, &now)
        })
        .map_err(CoreError::from)?;

        let after = self.control_state()?;
        self.audit_best_effort(
            actor,
            AuditAction::SystemLimits,
            None,
            serde_json::to_value(&before).ok(),
            serde_json::to_value(&after).ok(),
        );
        Ok(after)
    }

    /// Merge the outcome of an externally-triggered batch run into the
    /// control singleton.
    pub fn record_batch_result(&self, processed: i64) -> Result<()> {
        let now = now_rfc3339();
        self.with_write(|| {
            let conn = self.conn()?;
            ControlRepo::record_batch(&conn, processed, &now)
        })
        .map_err(CoreError::from)
    }

    // ─────────────────────────────────────────────────────────────────
    // System settings
    // ─────────────────────────────────────────────────────────────────

    /// Read settings with implicit default materialization — the
    /// caller never sees an absent document.
    pub fn settings(&self) -> Result<SystemSettings> {
        let conn = self.conn().map_err(CoreError::from)?;
        Ok(SettingsRepo::get(&conn)
            .map_err(CoreError::from)?
            .unwrap_or_default())
    }

    /// Apply a partial settings update; string sets are normalized.
    pub fn update_settings(&self, actor: &str, mut update: SettingsUpdate) -> Result<SystemSettings> {
        if update.is_empty() {
            return Err(CoreError::Validation("no settings fields supplied".into()));
        }
        if let Some(threshold) = update.score_threshold {
            validate::validate_unit_interval(threshold, "scoreThreshold")?;
        }
        if let Some(ttl) = update.routing_cache_ttl_sec {
            validate::validate_positive_i64(ttl, "routingCacheTtlSec")?;
        }
        for set in [
            &mut update.blacklist_domains,
            &mut update.whitelist_domains,
            &mut update.spam_keywords,
            &mut update.urgent_keywords,
        ] {
            if let Some(values) = set.take() {
                *set = Some(validate::normalize_string_set(&values));
            }
        }

        let before = self.settings()?;
        let now = now_rfc3339();
        self.with_write(|| {
            let conn = self.conn()?;
            SettingsRepo::upsert(&conn, &update, &now)
        })
        .map_err(CoreError::from)?;

        let after = self.settings()?;
        self.audit_best_effort(
            actor,
            AuditAction::SettingsUpdate,
            None,
            serde_json::to_value(&before).ok(),
            serde_json::to_value(&after).ok(),
        );
        Ok(after)
    }

    // ─────────────────────────────────────────────────────────────────
    // Preferences
    // ─────────────────────────────────────────────────────────────────

    /// List opt-out preferences, optionally for one user.
    pub fn list_preferences(&self, user_id: Option<&str>) -> Result<Vec<UserPreference>> {
        let conn = self.conn().map_err(CoreError::from)?;
        FeedbackRepo::list(&conn, user_id).map_err(CoreError::from)
    }

    /// Delete (un-block) one preference. Fails `NotFound` when absent.
    pub fn delete_preference(&self, actor: &str, user_id: &str, sender: &str) -> Result<()> {
        let before = {
            let conn = self.conn().map_err(CoreError::from)?;
            FeedbackRepo::get(&conn, user_id, sender)
                .map_err(CoreError::from)?
                .ok_or_else(|| {
                    CoreError::NotFound(format!("preference {user_id}/{sender}"))
                })?
        };

        let deleted = self
            .with_write(|| {
                let conn = self.conn()?;
                FeedbackRepo::delete(&conn, user_id, sender)
            })
            .map_err(CoreError::from)?;
        if !deleted {
            return Err(CoreError::NotFound(format!("preference {user_id}/{sender}")));
        }

        self.audit_best_effort(
            actor,
            AuditAction::PreferenceDelete,
            Some(&UserPreference::key(user_id, sender)),
            serde_json::to_value(&before).ok(),
            None,
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // Usage ledger
    // ─────────────────────────────────────────────────────────────────

    /// One day's usage, zeros when the pipeline has not written it.
    pub fn daily_usage(&self, date: &str) -> Result<DailyUsageRecord> {
        let conn = self.conn().map_err(CoreError::from)?;
        Ok(UsageRepo::get(&conn, date)
            .map_err(CoreError::from)?
            .unwrap_or_else(|| DailyUsageRecord::empty(date)))
    }

    /// Monthly usage report over the raw event records. A scan failure
    /// surfaces `StoreUnavailable`; the report is never partial.
    pub fn monthly_report(&self, year_month: &str, pricing: &TokenPricing) -> Result<MonthlyReport> {
        let (start, end) = month_window(year_month)?;
        let events = {
            let conn = self.conn().map_err(CoreError::from)?;
            EventRepo::scan_window(&conn, start, end).map_err(CoreError::from)?
        };
        monthly_report(&events, year_month, pricing)
    }

    // ─────────────────────────────────────────────────────────────────
    // Email events (read model + manual overrides)
    // ─────────────────────────────────────────────────────────────────

    /// One event, or `NotFound`.
    pub fn get_event(&self, email_id: &str) -> Result<EmailEvent> {
        let conn = self.conn().map_err(CoreError::from)?;
        EventRepo::get(&conn, email_id)
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::NotFound(format!("event {email_id}")))
    }

    /// Filtered event query with the documented degradation: when the
    /// indexed path fails (missing composite index), over-fetch the
    /// newest [`FALLBACK_SCAN_LIMIT`] records, filter in memory, and
    /// truncate to the requested limit. Matches older than the
    /// over-fetch window can be missed during fallback — by contract.
    pub fn query_events(&self, filter: &EventFilter) -> Result<Vec<EmailEvent>> {
        let conn = self.conn().map_err(CoreError::from)?;
        match EventRepo::query_filtered(&conn, filter) {
            Ok(events) => Ok(events),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "indexed event query failed, falling back to bounded scan"
                );
                let recent =
                    EventRepo::recent(&conn, FALLBACK_SCAN_LIMIT).map_err(CoreError::from)?;
                Ok(Self::filter_in_memory(recent, filter))
            }
        }
    }

    fn filter_in_memory(events: Vec<EmailEvent>, filter: &EventFilter) -> Vec<EmailEvent> {
        events
            .into_iter()
            .filter(|event| {
                if let Some(category) = filter.category {
                    if event.final_category != category {
                        return false;
                    }
                }
                if let Some(date) = &filter.date {
                    let Some(instant) = event.bucket_instant() else {
                        return false;
                    };
                    if mailgate_core::time::day_key(instant) != *date {
                        return false;
                    }
                }
                true
            })
            .take(filter.limit)
            .collect()
    }

    /// Record a manual trigger/block override on an event and audit it
    /// with the pipeline outcome.
    pub fn record_override(
        &self,
        actor: &str,
        email_id: &str,
        category: EventCategory,
        reason: &str,
        outcome: std::result::Result<(), String>,
    ) -> Result<()> {
        let changed = self
            .with_write(|| {
                let conn = self.conn()?;
                EventRepo::mark_override(&conn, email_id, category, reason)
            })
            .map_err(CoreError::from)?;
        if !changed {
            return Err(CoreError::NotFound(format!("event {email_id}")));
        }

        let after = json!({
            "finalCategory": category.as_str(),
            "reason": reason,
            "pipelineOutcome": match &outcome {
                Ok(()) => json!({"success": true}),
                Err(msg) => json!({"success": false, "error": msg}),
            },
        });
        self.audit_best_effort(
            actor,
            AuditAction::NotifyOverride,
            Some(email_id),
            None,
            Some(after),
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
