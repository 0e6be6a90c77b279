//! Daily-usage repository — read side of the `daily_usage` ledger.
//!
//! The pipeline increments these rows; the control plane only reads
//! them to render budget consumption.

use mailgate_core::types::DailyUsageRecord;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;

/// Daily-usage repository — stateless, every method takes `&Connection`.
pub struct UsageRepo;

impl UsageRepo {
    /// Read one day's record, or `None` when the pipeline has not
    /// written anything for that date yet.
    pub fn get(conn: &Connection, date: &str) -> Result<Option<DailyUsageRecord>> {
        let row = conn
            .query_row(
                "SELECT date, calls, cost_usd, input_tokens, output_tokens
                 FROM daily_usage WHERE date = ?1",
                params![date],
                |row| {
                    Ok(DailyUsageRecord {
                        date: row.get(0)?,
                        calls: row.get(1)?,
                        cost_usd: row.get(2)?,
                        input_tokens: row.get(3)?,
                        output_tokens: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Pipeline-parity write used by tests and local seeding.
    pub fn upsert(conn: &Connection, record: &DailyUsageRecord, now: &str) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO daily_usage (date, calls, cost_usd, input_tokens, output_tokens, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(date) DO UPDATE SET
                calls = excluded.calls,
                cost_usd = excluded.cost_usd,
                input_tokens = excluded.input_tokens,
                output_tokens = excluded.output_tokens,
                updated_at = excluded.updated_at",
            params![
                record.date,
                record.calls,
                record.cost_usd,
                record.input_tokens,
                record.output_tokens,
                now
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    #[test]
    fn get_reads_back_upserted_day() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        assert!(UsageRepo::get(&conn, "2025-05-01").unwrap().is_none());

        let record = DailyUsageRecord {
            date: "2025-05-01".to_string(),
            calls: 12,
            cost_usd: 0.34,
            input_tokens: 4000,
            output_tokens: 900,
        };
        UsageRepo::upsert(&conn, &record, "2025-05-01T01:00:00+00:00").unwrap();
        assert_eq!(UsageRepo::get(&conn, "2025-05-01").unwrap(), Some(record));
    }
}
