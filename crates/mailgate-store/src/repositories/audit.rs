//! Audit-trail repository — append-only `audit_logs` table.
//!
//! A dumb, trusted sink: no business validation, no update, no delete.

use mailgate_core::types::{AuditAction, AuditLogEntry};
use rusqlite::{Connection, params};

use crate::errors::{Result, StoreError};

/// Audit repository — stateless, every method takes `&Connection`.
pub struct AuditRepo;

impl AuditRepo {
    /// Append one entry. The only failure mode is the store itself.
    pub fn append(conn: &Connection, entry: &AuditLogEntry) -> Result<()> {
        let before = entry
            .before
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let after = entry
            .after
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let _ = conn.execute(
            "INSERT INTO audit_logs (id, actor, action, target, before_snapshot, after_snapshot, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.actor,
                entry.action.as_str(),
                entry.target,
                before,
                after,
                entry.timestamp
            ],
        )?;
        Ok(())
    }

    /// Newest-first listing, bounded by `limit`.
    pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, actor, action, target, before_snapshot, after_snapshot, timestamp
             FROM audit_logs ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(raw_to_entry).collect()
    }

    /// Entries touching a specific target, newest first.
    pub fn for_target(conn: &Connection, target: &str, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, actor, action, target, before_snapshot, after_snapshot, timestamp
             FROM audit_logs WHERE target = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![target, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(raw_to_entry).collect()
    }
}

type RawAuditRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn raw_to_entry(raw: RawAuditRow) -> Result<AuditLogEntry> {
    let (id, actor, action, target, before, after, timestamp) = raw;
    let action = AuditAction::parse(&action)
        .ok_or_else(|| StoreError::Internal(format!("unknown audit action {action:?}")))?;
    Ok(AuditLogEntry {
        id,
        actor,
        action,
        target,
        before: before.as_deref().map(serde_json::from_str).transpose()?,
        after: after.as_deref().map(serde_json::from_str).transpose()?,
        timestamp,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
