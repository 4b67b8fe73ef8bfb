//! Time helpers - business-timezone conversion
//!
//! All date→timestamp conversion happens at the API handler layer; the
//! store and the engines only ever see `i64` Unix millis.

use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// Current instant as Unix millis
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse a date string (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// Start of day (00:00:00) → Unix millis in the business timezone
///
/// DST gap fallback: if the local midnight does not exist, fall back to
/// the UTC interpretation.
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// End of day → next day's 00:00:00 as Unix millis
///
/// Callers use `< end` (exclusive) semantics.
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    day_start_millis(next_day, tz)
}

/// Unix millis → calendar date in the business timezone
pub fn millis_to_date(ms: i64, tz: Tz) -> NaiveDate {
    chrono::DateTime::from_timestamp_millis(ms)
        .unwrap_or_default()
        .with_timezone(&tz)
        .date_naive()
}

/// Today's calendar date in the business timezone
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Bounds of the calendar day containing `ms`, as `[start, end)` millis
pub fn day_bounds_of(ms: i64, tz: Tz) -> (i64, i64) {
    let date = millis_to_date(ms, tz);
    (day_start_millis(date, tz), day_end_millis(date, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let start = day_start_millis(date, chrono_tz::UTC);
        let end = day_end_millis(date, chrono_tz::UTC);
        assert_eq!(end - start, Duration::days(1).num_milliseconds());
        assert_eq!(millis_to_date(start, chrono_tz::UTC), date);
        assert_eq!(millis_to_date(end - 1, chrono_tz::UTC), date);
    }

    #[test]
    fn parse_date_rejects_malformed_input() {
        assert!(parse_date("2026-08-06").is_ok());
        assert!(parse_date("06/08/2026").is_err());
        assert!(parse_date("not-a-date").is_err());
    }

    #[test]
    fn bounds_respect_the_business_timezone() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let utc_start = day_start_millis(date, chrono_tz::UTC);
        let dubai_start = day_start_millis(date, chrono_tz::Asia::Dubai);
        // Dubai midnight is 4 hours before UTC midnight.
        assert_eq!(utc_start - dubai_start, Duration::hours(4).num_milliseconds());
    }
}
