//! System-settings repository — the `system_settings/general` singleton.

use mailgate_core::types::{SettingsUpdate, SystemSettings};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;

/// System-settings repository — stateless, every method takes `&Connection`.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Read the singleton, or `None` if it has never been written.
    pub fn get(conn: &Connection) -> Result<Option<SystemSettings>> {
        let row = conn
            .query_row(
                "SELECT score_threshold, routing_cache_ttl_sec, blacklist_domains,
                        whitelist_domains, spam_keywords, urgent_keywords
                 FROM system_settings WHERE id = 'general'",
                [],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((threshold, ttl, black, white, spam, urgent)) => Ok(Some(SystemSettings {
                score_threshold: threshold,
                routing_cache_ttl_sec: ttl,
                blacklist_domains: serde_json::from_str(&black)?,
                whitelist_domains: serde_json::from_str(&white)?,
                spam_keywords: serde_json::from_str(&spam)?,
                urgent_keywords: serde_json::from_str(&urgent)?,
            })),
        }
    }

    /// Apply a partial update over the current (or default) settings.
    ///
    /// String sets must already be normalized by the caller. Writes the
    /// full singleton row; unsupplied fields keep their current value
    /// via `COALESCE` so the merge stays field-granular.
    pub fn upsert(conn: &Connection, update: &SettingsUpdate, now: &str) -> Result<()> {
        let defaults = SystemSettings::default();
        let to_json = |set: &Option<Vec<String>>| -> Result<Option<String>> {
            set.as_ref()
                .map(|v| serde_json::to_string(v))
                .transpose()
                .map_err(Into::into)
        };

        let _ = conn.execute(
            "INSERT INTO system_settings
                (id, score_threshold, routing_cache_ttl_sec, blacklist_domains,
                 whitelist_domains, spam_keywords, urgent_keywords, updated_at)
             VALUES ('general',
                COALESCE(?1, ?7), COALESCE(?2, ?8),
                COALESCE(?3, ?9), COALESCE(?4, ?9), COALESCE(?5, ?9), COALESCE(?6, ?9),
                ?10)
             ON CONFLICT(id) DO UPDATE SET
                score_threshold = COALESCE(?1, score_threshold),
                routing_cache_ttl_sec = COALESCE(?2, routing_cache_ttl_sec),
                blacklist_domains = COALESCE(?3, blacklist_domains),
                whitelist_domains = COALESCE(?4, whitelist_domains),
                spam_keywords = COALESCE(?5, spam_keywords),
                urgent_keywords = COALESCE(?6, urgent_keywords),
                updated_at = ?10",
            params![
                update.score_threshold,
                update.routing_cache_ttl_sec,
                to_json(&update.blacklist_domains)?,
                to_json(&update.whitelist_domains)?,
                to_json(&update.spam_keywords)?,
                to_json(&update.urgent_keywords)?,
                defaults.score_threshold,
                defaults.routing_cache_ttl_sec,
                "[]",
                now,
            ],
        )?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
