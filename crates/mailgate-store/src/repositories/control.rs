//! System-control repository — the `system_control/status` singleton.
//!
//! Every write is a single upsert that touches only the columns the
//! command owns, so pause/resume/limits/batch-info merge at field
//! granularity exactly like the document store they model.

use mailgate_core::types::{
    DEFAULT_DAILY_LIMIT_CALLS, DEFAULT_DAILY_LIMIT_COST_USD, SystemControlState,
};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;

/// System-control repository — stateless, every method takes `&Connection`.
pub struct ControlRepo;

impl ControlRepo {
    /// Read the singleton, or `None` if it has never been written.
    pub fn get(conn: &Connection) -> Result<Option<SystemControlState>> {
        let row = conn
            .query_row(
                "SELECT enabled, paused_at, paused_by, pause_reason,
                        daily_limit_calls, daily_limit_cost_usd,
                        last_batch_at, last_batch_processed
                 FROM system_control WHERE id = 'status'",
                [],
                |row| {
                    Ok(SystemControlState {
                        enabled: row.get(0)?,
                        paused_at: row.get(1)?,
                        paused_by: row.get(2)?,
                        pause_reason: row.get(3)?,
                        daily_limit_calls: row.get(4)?,
                        daily_limit_cost_usd: row.get(5)?,
                        last_batch_at: row.get(6)?,
                        last_batch_processed: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Pause: `enabled = false` plus the full pause metadata, written
    /// atomically in one statement. Idempotent — pausing an already
    /// paused system overwrites the metadata.
    pub fn pause(conn: &Connection, actor: &str, reason: &str, now: &str) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO system_control
                (id, enabled, paused_at, paused_by, pause_reason,
                 daily_limit_calls, daily_limit_cost_usd, last_batch_processed, updated_at)
             VALUES ('status', 0, ?1, ?2, ?3, ?4, ?5, 0, ?1)
             ON CONFLICT(id) DO UPDATE SET
                enabled = 0,
                paused_at = excluded.paused_at,
                paused_by = excluded.paused_by,
                pause_reason = excluded.pause_reason,
                updated_at = excluded.updated_at",
            params![
                now,
                actor,
                reason,
                DEFAULT_DAILY_LIMIT_CALLS,
                DEFAULT_DAILY_LIMIT_COST_USD
            ],
        )?;
        Ok(())
    }

    /// Resume: `enabled = true`, all pause metadata cleared together.
    pub fn resume(conn: &Connection, now: &str) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO system_control
                (id, enabled, daily_limit_calls, daily_limit_cost_usd, last_batch_processed, updated_at)
             VALUES ('status', 1, ?1, ?2, 0, ?3)
             ON CONFLICT(id) DO UPDATE SET
                enabled = 1,
                paused_at = NULL,
                paused_by = NULL,
                pause_reason = NULL,
                updated_at = excluded.updated_at",
            params![DEFAULT_DAILY_LIMIT_CALLS, DEFAULT_DAILY_LIMIT_COST_USD, now],
        )?;
        Ok(())
    }

    /// Update only the supplied limit fields.
    pub fn set_limits(
        conn: &Connection,
        calls: Option<i64>,
        cost_usd: Option<f64>,
        now: &str,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO system_control
                (id, enabled, daily_limit_calls, daily_limit_cost_usd, last_batch_processed, updated_at)
             VALUES ('status', 1, COALESCE(?1, ?3), COALESCE(?2, ?4), 0, ?5)
             ON CONFLICT(id) DO UPDATE SET
                daily_limit_calls = COALESCE(?1, daily_limit_calls),
                daily_limit_cost_usd = COALESCE(?2, daily_limit_cost_usd),
                updated_at = excluded.updated_at",
            params![
                calls,
                cost_usd,
                DEFAULT_DAILY_LIMIT_CALLS,
                DEFAULT_DAILY_LIMIT_COST_USD,
                now
            ],
        )?;
        Ok(())
    }

    /// Record the outcome of an externally-triggered batch run.
    pub fn record_batch(conn: &Connection, processed: i64, now: &str) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO system_control
                (id, enabled, daily_limit_calls, daily_limit_cost_usd,
                 last_batch_at, last_batch_processed, updated_at)
             VALUES ('status', 1, ?2, ?3, ?4, ?1, ?4)
             ON CONFLICT(id) DO UPDATE SET
                last_batch_at = excluded.last_batch_at,
                last_batch_processed = excluded.last_batch_processed,
                updated_at = excluded.updated_at",
            params![
                processed,
                DEFAULT_DAILY_LIMIT_CALLS,
                DEFAULT_DAILY_LIMIT_COST_USD,
                now
            ],
        )?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn unwritten_singleton_reads_none() {
        let conn = setup();
        assert!(ControlRepo::get(&conn).unwrap().is_none());
    }

    #[test]
    fn pause_populates_all_metadata_atomically() {
        let conn = setup();
        ControlRepo::pause(&conn, "jihyun", "incident", "2025-05-01T00:00:00+00:00").unwrap();

        let state = ControlRepo::get(&conn).unwrap().unwrap();
        assert!(!state.enabled);
        assert_eq!(state.paused_by.as_deref(), Some("jihyun"));
        assert_eq!(state.pause_reason.as_deref(), Some("incident"));
        assert!(state.pause_metadata_consistent());
    }

    #[test]
    fn second_pause_overwrites_metadata() {
        let conn = setup();
        ControlRepo::pause(&conn, "a", "first", "2025-05-01T00:00:00+00:00").unwrap();
        ControlRepo::pause(&conn, "b", "second", "2025-05-02T00:00:00+00:00").unwrap();

        let state = ControlRepo::get(&conn).unwrap().unwrap();
        assert_eq!(state.paused_by.as_deref(), Some("b"));
        assert_eq!(state.pause_reason.as_deref(), Some("second"));
        assert_eq!(state.paused_at.as_deref(), Some("2025-05-02T00:00:00+00:00"));
    }

    #[test]
    fn resume_clears_metadata_together() {
        let conn = setup();
        ControlRepo::pause(&conn, "a", "why", "2025-05-01T00:00:00+00:00").unwrap();
        ControlRepo::resume(&conn, "2025-05-02T00:00:00+00:00").unwrap();

        let state = ControlRepo::get(&conn).unwrap().unwrap();
        assert!(state.enabled);
        assert!(state.paused_at.is_none());
        assert!(state.paused_by.is_none());
        assert!(state.pause_reason.is_none());
    }

    #[test]
    fn set_limits_merges_only_supplied_fields() {
        let conn = setup();
        ControlRepo::set_limits(&conn, Some(2000), None, "2025-05-01T00:00:00+00:00").unwrap();
        ControlRepo::set_limits(&conn, None, Some(9.5), "2025-05-02T00:00:00+00:00").unwrap();

        let state = ControlRepo::get(&conn).unwrap().unwrap();
        assert_eq!(state.daily_limit_calls, 2000);
        assert!((state.daily_limit_cost_usd - 9.5).abs() < f64::EPSILON);
    }

    #[test]
    fn set_limits_does_not_disturb_pause_state() {
        let conn = setup();
        ControlRepo::pause(&conn, "a", "why", "2025-05-01T00:00:00+00:00").unwrap();
        ControlRepo::set_limits(&conn, Some(50), None, "2025-05-02T00:00:00+00:00").unwrap();

        let state = ControlRepo::get(&conn).unwrap().unwrap();
        assert!(!state.enabled);
        assert_eq!(state.daily_limit_calls, 50);
    }

    #[test]
    fn record_batch_merges_batch_fields() {
        let conn = setup();
        ControlRepo::record_batch(&conn, 42, "2025-05-01T00:00:00+00:00").unwrap();
        let state = ControlRepo::get(&conn).unwrap().unwrap();
        assert_eq!(state.last_batch_processed, 42);
        assert_eq!(state.last_batch_at.as_deref(), Some("2025-05-01T00:00:00+00:00"));
    }
}
