//! Date ranges for feed queries.
//!
//! This module provides [`DateRange`], an inclusive range of calendar days,
//! and the parsing rules used for user supplied `start`/`end`/`days` values.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date format accepted for user supplied dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of days covered when neither an end date nor a day count is given.
pub const DEFAULT_DAYS: i64 = 7;

/// Errors produced while validating a date range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    /// The start date could not be parsed.
    #[error("start date is invalid: {0}")]
    InvalidStart(String),

    /// The end date could not be parsed.
    #[error("end date is invalid: {0}")]
    InvalidEnd(String),

    /// The day count is not a valid integer.
    #[error("day amount is not a valid integer: {0}")]
    InvalidDays(String),

    /// Both an end date and a day count were supplied.
    #[error("end date and day amount cannot both be given")]
    Conflicting,

    /// The end date is not after the start date.
    #[error("end date must be after start date")]
    EndBeforeStart,

    /// The range reaches past the representable calendar.
    #[error("date range is out of bounds")]
    OutOfRange,
}

/// An inclusive range of calendar days `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day (inclusive).
    pub start: NaiveDate,
    /// Last day (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new range, rejecting an end before the start.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if end < start {
            return Err(DateRangeError::EndBeforeStart);
        }
        Ok(Self { start, end })
    }

    /// Parses the user facing query values.
    ///
    /// - `start` defaults to `today`
    /// - `end` and `days` are mutually exclusive; `days` counts inclusively
    /// - without either the range covers [`DEFAULT_DAYS`] days
    /// - the resulting end must lie after the start
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        days: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, DateRangeError> {
        let start = match non_empty(start) {
            Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map_err(|_| DateRangeError::InvalidStart(s.to_string()))?,
            None => today,
        };

        let end = match (non_empty(end), non_empty(days)) {
            (Some(_), Some(_)) => return Err(DateRangeError::Conflicting),
            (Some(e), None) => NaiveDate::parse_from_str(e, DATE_FORMAT)
                .map_err(|_| DateRangeError::InvalidEnd(e.to_string()))?,
            (None, Some(d)) => {
                let count: i64 = d
                    .trim()
                    .parse()
                    .map_err(|_| DateRangeError::InvalidDays(d.to_string()))?;
                add_days(start, count).ok_or(DateRangeError::OutOfRange)?
            }
            (None, None) => add_days(start, DEFAULT_DAYS).ok_or(DateRangeError::OutOfRange)?,
        };

        if end <= start {
            return Err(DateRangeError::EndBeforeStart);
        }

        Ok(Self { start, end })
    }

    /// Returns every day of the range in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|day| *day <= self.end)
    }

    /// Returns the number of days in the range.
    pub fn num_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Returns true if the given day lies inside the range.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Last day of a range of `count` days starting at `start`.
fn add_days(start: NaiveDate, count: i64) -> Option<NaiveDate> {
    start.checked_add_signed(Duration::try_days(count.checked_sub(1)?)?)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_to_a_week_from_today() {
        let today = date(2025, 3, 3);
        let range = DateRange::parse(None, None, None, today).unwrap();
        assert_eq!(range.start, today);
        assert_eq!(range.end, date(2025, 3, 9));
        assert_eq!(range.num_days(), 7);
    }

    #[test]
    fn explicit_end() {
        let range =
            DateRange::parse(Some("2025-03-03"), Some("2025-03-05"), None, date(2000, 1, 1))
                .unwrap();
        assert_eq!(range.start, date(2025, 3, 3));
        assert_eq!(range.end, date(2025, 3, 5));
    }

    #[test]
    fn day_count_is_inclusive() {
        let range = DateRange::parse(Some("2025-03-03"), None, Some("3"), date(2000, 1, 1)).unwrap();
        assert_eq!(range.end, date(2025, 3, 5));
    }

    #[test]
    fn empty_values_are_ignored() {
        let today = date(2025, 3, 3);
        let range = DateRange::parse(Some(""), Some(" "), Some(""), today).unwrap();
        assert_eq!(range.start, today);
        assert_eq!(range.num_days(), 7);
    }

    #[test]
    fn rejects_invalid_input() {
        let today = date(2025, 3, 3);
        assert_eq!(
            DateRange::parse(Some("03.03.2025"), None, None, today),
            Err(DateRangeError::InvalidStart("03.03.2025".into()))
        );
        assert_eq!(
            DateRange::parse(None, Some("tomorrow"), None, today),
            Err(DateRangeError::InvalidEnd("tomorrow".into()))
        );
        assert_eq!(
            DateRange::parse(None, None, Some("many"), today),
            Err(DateRangeError::InvalidDays("many".into()))
        );
        assert_eq!(
            DateRange::parse(None, Some("2025-03-05"), Some("3"), today),
            Err(DateRangeError::Conflicting)
        );
        assert_eq!(
            DateRange::parse(Some("2025-03-05"), Some("2025-03-05"), None, today),
            Err(DateRangeError::EndBeforeStart)
        );
        assert_eq!(
            DateRange::parse(None, None, Some("1"), today),
            Err(DateRangeError::EndBeforeStart)
        );
    }

    #[test]
    fn huge_day_counts_are_rejected() {
        let today = date(2025, 3, 3);
        for days in ["100000000", "9223372036854775807", "-9223372036854775808"] {
            assert_eq!(
                DateRange::parse(None, None, Some(days), today),
                Err(DateRangeError::OutOfRange),
                "days = {days}"
            );
        }
        assert_eq!(
            DateRange::parse(None, None, None, NaiveDate::MAX),
            Err(DateRangeError::OutOfRange)
        );
    }

    #[test]
    fn days_iterates_inclusively() {
        let range = DateRange::new(date(2025, 2, 27), date(2025, 3, 2)).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(
            days,
            vec![date(2025, 2, 27), date(2025, 2, 28), date(2025, 3, 1), date(2025, 3, 2)]
        );
        assert!(range.contains(date(2025, 3, 1)));
        assert!(!range.contains(date(2025, 3, 3)));
    }

    #[test]
    fn single_day_range_via_new() {
        let range = DateRange::new(date(2025, 3, 3), date(2025, 3, 3)).unwrap();
        assert_eq!(range.days().count(), 1);
        assert!(DateRange::new(date(2025, 3, 3), date(2025, 3, 2)).is_err());
    }
}
