//! Reference-timezone day bucketing.
//!
//! "Today" and monthly report windows are computed at a fixed UTC+9
//! offset (KST), independent of the server's or the store's local
//! clock, so day buckets are stable across deployment regions.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::errors::{CoreError, Result};

/// Fixed reference offset: UTC+9 (KST).
pub const REFERENCE_OFFSET_HOURS: i32 = 9;

/// The reference offset as a chrono [`FixedOffset`].
pub fn reference_offset() -> FixedOffset {
    FixedOffset::east_opt(REFERENCE_OFFSET_HOURS * 3600).expect("UTC+9 is a valid offset")
}

/// Local `YYYY-MM-DD` key for an instant, at the reference offset.
pub fn day_key(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&reference_offset())
        .format("%Y-%m-%d")
        .to_string()
}

/// Today's `YYYY-MM-DD` key at the reference offset.
pub fn today_key() -> String {
    day_key(Utc::now())
}

/// Half-open UTC window `[start, end)` covering a `YYYY-MM` month at
/// the reference offset.
pub fn month_window(year_month: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::parse_from_str(&format!("{year_month}-01"), "%Y-%m-%d")
        .map_err(|_| CoreError::Validation(format!("invalid month key: {year_month}")))?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .ok_or_else(|| CoreError::Validation(format!("invalid month key: {year_month}")))?;

    let offset = reference_offset();
    let start = local_midnight(&offset, first)?;
    let end = local_midnight(&offset, next)?;
    Ok((start, end))
}

fn local_midnight(offset: &FixedOffset, date: NaiveDate) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CoreError::Validation(format!("invalid date: {date}")))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CoreError::Validation(format!("ambiguous local midnight: {date}")))
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
