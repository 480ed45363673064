//! Calendar-day handling.
//!
//! Every date that is stored, compared, or used as a map key is a
//! [`NaiveDate`] holding the UTC calendar day. Inputs that carry a time or an
//! offset are converted to UTC before the time-of-day is dropped, so one
//! logical day always has exactly one key.

use crate::error::{Result, TrendsError};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::fmt;

/// Storage and display format of a calendar day.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Length of the trailing "recent activity" window and of the fallback
/// release window: nine weeks, three iteration cycles.
pub const RECENT_WINDOW_DAYS: i64 = 63;

/// Sentinel resolving to the most recent snapshot date.
pub const LATEST: &str = "_latest";

/// Sentinel resolving to the oldest snapshot date.
pub const EARLIEST: &str = "_earliest";

/// A date input before it has been resolved against the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DateSpec {
    /// `""` or `_latest`
    #[default]
    Latest,
    /// `_earliest`
    Earliest,
    /// A literal calendar day.
    Day(NaiveDate),
}

impl DateSpec {
    /// Parse a date-accepting input.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if the value is neither a sentinel nor a date.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "" | LATEST => Ok(Self::Latest),
            EARLIEST => Ok(Self::Earliest),
            other => parse_day(other).map(Self::Day),
        }
    }
}

impl fmt::Display for DateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Earliest => f.write_str(EARLIEST),
            Self::Day(day) => write!(f, "{}", day.format(DAY_FORMAT)),
        }
    }
}

/// Parse a literal calendar day.
///
/// Accepts `YYYY-MM-DD` or an RFC3339 timestamp; the latter is converted to
/// UTC and truncated to its day.
///
/// # Errors
///
/// Returns `InvalidDate` if the value is not in either format.
pub fn parse_day(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(day) = NaiveDate::parse_from_str(s, DAY_FORMAT) {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| TrendsError::InvalidDate {
            value: s.to_string(),
        })
}

/// Render a day as stored in the database.
#[must_use]
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Today's UTC calendar day.
#[must_use]
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// `end` minus `days` calendar days, clamped to the earliest representable date.
#[must_use]
pub fn days_before(end: NaiveDate, days: i64) -> NaiveDate {
    end.checked_sub_signed(Duration::days(days))
        .unwrap_or(NaiveDate::MIN)
}

/// Start of the trailing window that ends on `end`.
#[must_use]
pub fn recent_window_start(end: NaiveDate) -> NaiveDate {
    days_before(end, RECENT_WINDOW_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DAY_FORMAT).unwrap()
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(DateSpec::parse("").unwrap(), DateSpec::Latest);
        assert_eq!(DateSpec::parse("_latest").unwrap(), DateSpec::Latest);
        assert_eq!(DateSpec::parse("  _earliest ").unwrap(), DateSpec::Earliest);
        assert_eq!(
            DateSpec::parse("2023-01-10").unwrap(),
            DateSpec::Day(day("2023-01-10"))
        );
    }

    #[test]
    fn test_invalid_date() {
        let err = DateSpec::parse("yesterday").unwrap_err();
        assert!(matches!(err, TrendsError::InvalidDate { value } if value == "yesterday"));
        assert!(parse_day("2024-02-30").is_err());
    }

    #[test]
    fn test_timestamp_normalizes_to_utc_day() {
        // Same instant, two offsets: one key.
        let a = parse_day("2024-03-01T23:30:00-05:00").unwrap();
        let b = parse_day("2024-03-02T04:30:00Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, day("2024-03-02"));
    }

    #[test]
    fn test_recent_window_is_nine_weeks() {
        assert_eq!(recent_window_start(day("2023-04-01")), day("2023-01-28"));
        assert_eq!(days_before(day("2024-03-01"), 1), day("2024-02-29"));
    }

    #[test]
    fn test_display_round_trips() {
        for s in ["_latest", "_earliest", "2024-12-31"] {
            assert_eq!(DateSpec::parse(s).unwrap().to_string(), s);
        }
        assert_eq!(format_day(day("2024-01-05")), "2024-01-05");
    }
}
