//! Sequential schema migrations, gated by `PRAGMA user_version`.

use rusqlite::Connection;

use crate::errors::Result;

/// Ordered migration batches. Index + 1 == resulting `user_version`.
const MIGRATIONS: &[&str] = &[
    // v1: full control-plane schema.
    "
    CREATE TABLE routing_rules (
        slack_user_id  TEXT PRIMARY KEY,
        display_name   TEXT,
        gmail_accounts TEXT NOT NULL,
        enabled        INTEGER NOT NULL DEFAULT 1,
        created_at     TEXT NOT NULL,
        updated_at     TEXT NOT NULL,
        updated_by     TEXT NOT NULL
    );
    CREATE INDEX idx_routing_rules_updated ON routing_rules(updated_at DESC);

    CREATE TABLE system_control (
        id                   TEXT PRIMARY KEY CHECK (id = 'status'),
        enabled              INTEGER NOT NULL,
        paused_at            TEXT,
        paused_by            TEXT,
        pause_reason         TEXT,
        daily_limit_calls    INTEGER NOT NULL,
        daily_limit_cost_usd REAL NOT NULL,
        last_batch_at        TEXT,
        last_batch_processed INTEGER NOT NULL DEFAULT 0,
        updated_at           TEXT NOT NULL
    );

    CREATE TABLE system_settings (
        id                    TEXT PRIMARY KEY CHECK (id = 'general'),
        score_threshold       REAL NOT NULL,
        routing_cache_ttl_sec INTEGER NOT NULL,
        blacklist_domains     TEXT NOT NULL,
        whitelist_domains     TEXT NOT NULL,
        spam_keywords         TEXT NOT NULL,
        urgent_keywords       TEXT NOT NULL,
        updated_at            TEXT NOT NULL
    );

    CREATE TABLE daily_usage (
        date          TEXT PRIMARY KEY,
        calls         INTEGER NOT NULL DEFAULT 0,
        cost_usd      REAL NOT NULL DEFAULT 0,
        input_tokens  INTEGER NOT NULL DEFAULT 0,
        output_tokens INTEGER NOT NULL DEFAULT 0,
        updated_at    TEXT
    );

    CREATE TABLE audit_logs (
        id              TEXT PRIMARY KEY,
        actor           TEXT NOT NULL,
        action          TEXT NOT NULL,
        target          TEXT,
        before_snapshot TEXT,
        after_snapshot  TEXT,
        timestamp       TEXT NOT NULL
    );
    CREATE INDEX idx_audit_logs_timestamp ON audit_logs(timestamp DESC);

    CREATE TABLE user_feedback (
        key             TEXT PRIMARY KEY,
        user_id         TEXT NOT NULL,
        sender          TEXT NOT NULL,
        subject_pattern TEXT,
        preference      TEXT NOT NULL,
        created_at      TEXT NOT NULL
    );
    CREATE INDEX idx_user_feedback_user ON user_feedback(user_id);

    CREATE TABLE email_events (
        email_id              TEXT PRIMARY KEY,
        subject               TEXT,
        from_email            TEXT NOT NULL,
        from_domain           TEXT NOT NULL,
        to_email              TEXT NOT NULL,
        final_category        TEXT NOT NULL,
        decision_source       TEXT NOT NULL,
        llm_score             REAL,
        reason                TEXT,
        summary               TEXT,
        llm_input_tokens      INTEGER,
        llm_output_tokens     INTEGER,
        llm_cache_read_tokens INTEGER,
        llm_cache_write_tokens INTEGER,
        slack_targets         TEXT NOT NULL,
        timestamp             TEXT,
        created_at            TEXT NOT NULL,
        manually_triggered    INTEGER NOT NULL DEFAULT 0,
        manually_blocked      INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX idx_email_events_receipt
        ON email_events(COALESCE(timestamp, created_at) DESC);
    CREATE INDEX idx_email_events_category_receipt
        ON email_events(final_category, COALESCE(timestamp, created_at) DESC);
    ",
];

/// Run any pending migrations. Idempotent; safe to call at every
/// startup and from every repo test.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (idx, batch) in MIGRATIONS.iter().enumerate() {
        let version = idx as i64 + 1;
        if version <= current {
            continue;
        }
        conn.execute_batch(&format!(
            "BEGIN; {batch}; PRAGMA user_version = {version}; COMMIT;"
        ))?;
        tracing::debug!(version, "applied migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0)).unwrap();
        assert_eq!(version, MIGRATIONS.len() as i64);
    }

    #[test]
    fn all_collections_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in [
            "routing_rules",
            "system_control",
            "system_settings",
            "daily_usage",
            "audit_logs",
            "user_feedback",
            "email_events",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }
}
