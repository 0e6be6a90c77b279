//! User-preference repository — the `user_feedback` opt-out table.
//!
//! Creation is pipeline-owned; the control plane lists and deletes.
//! The insert here exists for pipeline parity in tests and seeding.

use mailgate_core::types::UserPreference;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;

const FEEDBACK_COLUMNS: &str = "user_id, sender, subject_pattern, preference, created_at";

/// User-preference repository — stateless, every method takes `&Connection`.
pub struct FeedbackRepo;

impl FeedbackRepo {
    /// List preferences, optionally filtered to one user, newest first.
    pub fn list(conn: &Connection, user_id: Option<&str>) -> Result<Vec<UserPreference>> {
        let (sql, filter) = match user_id {
            Some(uid) => (
                format!(
                    "SELECT {FEEDBACK_COLUMNS} FROM user_feedback
                     WHERE user_id = ?1 ORDER BY created_at DESC, key"
                ),
                Some(uid.to_string()),
            ),
            None => (
                format!(
                    "SELECT {FEEDBACK_COLUMNS} FROM user_feedback ORDER BY created_at DESC, key"
                ),
                None,
            ),
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = match filter {
            Some(uid) => stmt
                .query_map(params![uid], row_to_preference)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], row_to_preference)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }

    /// Get one preference by its composite identity.
    pub fn get(conn: &Connection, user_id: &str, sender: &str) -> Result<Option<UserPreference>> {
        let key = UserPreference::key(user_id, sender);
        let row = conn
            .query_row(
                &format!("SELECT {FEEDBACK_COLUMNS} FROM user_feedback WHERE key = ?1"),
                params![key],
                row_to_preference,
            )
            .optional()?;
        Ok(row)
    }

    /// Delete (un-block). Returns `false` when no row matched.
    pub fn delete(conn: &Connection, user_id: &str, sender: &str) -> Result<bool> {
        let key = UserPreference::key(user_id, sender);
        let changed = conn.execute("DELETE FROM user_feedback WHERE key = ?1", params![key])?;
        Ok(changed > 0)
    }

    /// Pipeline-parity insert (tests, seeding).
    pub fn insert(conn: &Connection, pref: &UserPreference) -> Result<()> {
        let key = UserPreference::key(&pref.user_id, &pref.sender);
        let _ = conn.execute(
            "INSERT OR REPLACE INTO user_feedback (key, user_id, sender, subject_pattern, preference, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key,
                pref.user_id,
                pref.sender,
                pref.subject_pattern,
                pref.preference,
                pref.created_at
            ],
        )?;
        Ok(())
    }
}

fn row_to_preference(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserPreference> {
    Ok(UserPreference {
        user_id: row.get(0)?,
        sender: row.get(1)?,
        subject_pattern: row.get(2)?,
        preference: row.get(3)?,
        created_at: row.get(4)?,
    })
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

    fn pref(user: &str, sender: &str, created_at: &str) -> UserPreference {
        UserPreference {
            user_id: user.to_string(),
            sender: sender.to_string(),
            subject_pattern: Some("domain renewal notice".to_string()),
            preference: "silent".to_string(),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn list_filters_by_user() {
        let conn = setup();
        FeedbackRepo::insert(&conn, &pref("U0001AAAA", "noreply@a.com", "2025-05-01T00:00:00+00:00"))
            .unwrap();
        FeedbackRepo::insert(&conn, &pref("U0002BBBB", "noreply@b.com", "2025-05-02T00:00:00+00:00"))
            .unwrap();

        assert_eq!(FeedbackRepo::list(&conn, None).unwrap().len(), 2);
        let mine = FeedbackRepo::list(&conn, Some("U0001AAAA")).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].sender, "noreply@a.com");
    }

    #[test]
    fn delete_unblocks_by_composite_key() {
        let conn = setup();
        FeedbackRepo::insert(&conn, &pref("U0001AAAA", "noreply@a.com", "2025-05-01T00:00:00+00:00"))
            .unwrap();

        assert!(FeedbackRepo::delete(&conn, "U0001AAAA", "noreply@a.com").unwrap());
        assert!(FeedbackRepo::get(&conn, "U0001AAAA", "noreply@a.com").unwrap().is_none());
        assert!(!FeedbackRepo::delete(&conn, "U0001AAAA", "noreply@a.com").unwrap());
    }
}
