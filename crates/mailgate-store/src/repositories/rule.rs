//! Routing-rule repository — CRUD for the `routing_rules` table.

use mailgate_core::types::{RoutingRule, RuleUpdate};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;

const RULE_COLUMNS: &str =
    "slack_user_id, display_name, gmail_accounts, enabled, created_at, updated_at, updated_by";

/// Routing-rule repository — stateless, every method takes `&Connection`.
pub struct RuleRepo;

impl RuleRepo {
    /// List all rules, most recently modified first.
    pub fn list(conn: &Connection) -> Result<Vec<RoutingRule>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM routing_rules ORDER BY updated_at DESC, slack_user_id"
        ))?;
        let rows = stmt
            .query_map([], row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get one rule by id.
    pub fn get(conn: &Connection, slack_user_id: &str) -> Result<Option<RoutingRule>> {
        let row = conn
            .query_row(
                &format!("SELECT {RULE_COLUMNS} FROM routing_rules WHERE slack_user_id = ?1"),
                params![slack_user_id],
                row_to_rule,
            )
            .optional()?;
        Ok(row)
    }

    /// Check existence without materializing the row.
    pub fn exists(conn: &Connection, slack_user_id: &str) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM routing_rules WHERE slack_user_id = ?1)",
            params![slack_user_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Insert a fully-formed rule. The caller owns the conflict policy.
    pub fn insert(conn: &Connection, rule: &RoutingRule) -> Result<()> {
        let accounts = serde_json::to_string(&rule.gmail_accounts)?;
        let _ = conn.execute(
            "INSERT INTO routing_rules
                (slack_user_id, display_name, gmail_accounts, enabled, created_at, updated_at, updated_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                rule.slack_user_id,
                rule.display_name,
                accounts,
                rule.enabled,
                rule.created_at,
                rule.updated_at,
                rule.updated_by,
            ],
        )?;
        Ok(())
    }

    /// Apply a partial update, touching only supplied columns.
    ///
    /// Returns `false` when no row matched. `gmail_accounts` must
    /// already be normalized by the caller.
    pub fn update(
        conn: &Connection,
        slack_user_id: &str,
        update: &RuleUpdate,
        updated_by: &str,
        updated_at: &str,
    ) -> Result<bool> {
        let mut sets = vec!["updated_at = ?1".to_string(), "updated_by = ?2".to_string()];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(updated_at.to_string()),
            Box::new(updated_by.to_string()),
        ];

        if let Some(name) = &update.display_name {
            values.push(Box::new(name.clone()));
            sets.push(format!("display_name = ?{}", values.len()));
        }
        if let Some(accounts) = &update.gmail_accounts {
            values.push(Box::new(serde_json::to_string(accounts)?));
            sets.push(format!("gmail_accounts = ?{}", values.len()));
        }
        if let Some(enabled) = update.enabled {
            values.push(Box::new(enabled));
            sets.push(format!("enabled = ?{}", values.len()));
        }

        values.push(Box::new(slack_user_id.to_string()));
        let sql = format!(
            "UPDATE routing_rules SET {} WHERE slack_user_id = ?{}",
            sets.join(", "),
            values.len()
        );
        let changed = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(changed > 0)
    }

    /// Hard delete. Returns `false` when no row matched.
    pub fn delete(conn: &Connection, slack_user_id: &str) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM routing_rules WHERE slack_user_id = ?1",
            params![slack_user_id],
        )?;
        Ok(changed > 0)
    }
}

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoutingRule> {
    let accounts_json: String = row.get(2)?;
    let gmail_accounts = serde_json::from_str(&accounts_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(RoutingRule {
        slack_user_id: row.get(0)?,
        display_name: row.get(1)?,
        gmail_accounts,
        enabled: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        updated_by: row.get(6)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
