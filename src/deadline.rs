//! Deadline handling - calendar and epoch input to absolute instants
//!
//! All calendar conversions are done in UTC so a given date always maps to
//! the same instant, wherever the check runs.

use crate::error::DeadlineError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A calendar date with an optional time of day (defaults to midnight)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDeadline {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
}

impl CalendarDeadline {
    /// Midnight at the start of the given day
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    /// Set the time of day
    pub fn at(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    pub fn to_instant(&self) -> Result<DateTime<Utc>, DeadlineError> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(self.hour, self.minute, self.second))
            .map(|naive| naive.and_utc())
            .ok_or(DeadlineError::InvalidDate {
                year: self.year,
                month: self.month,
                day: self.day,
                hour: self.hour,
                minute: self.minute,
                second: self.second,
            })
    }

    /// Seconds since the Unix epoch
    pub fn to_epoch(&self) -> Result<i64, DeadlineError> {
        Ok(self.to_instant()?.timestamp())
    }
}

/// Instant for a count of seconds since the Unix epoch
pub fn from_epoch(seconds: i64) -> Result<DateTime<Utc>, DeadlineError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| DeadlineError::Unparseable(format!("@{}", seconds)))
}

/// True when `now + makespan` (seconds) falls on or before `deadline`
pub fn meets_deadline(now: DateTime<Utc>, makespan: u64, deadline: DateTime<Utc>) -> bool {
    i64::try_from(makespan)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|span| now.checked_add_signed(span))
        .is_some_and(|finish| finish <= deadline)
}

/// Parse a user-supplied deadline
///
/// Accepted forms:
/// - RFC 3339 (`2026-12-01T17:00:00+02:00`)
/// - `YYYY-MM-DD`, `YYYY-MM-DD HH:MM`, `YYYY-MM-DD HH:MM:SS` (UTC, `T` separator also accepted)
/// - `@<seconds since epoch>`
/// - `+<seconds>` or `+<n>s|m|h|d`, relative to `now`
pub fn parse_deadline(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, DeadlineError> {
    let input = input.trim();
    let unparseable = || DeadlineError::Unparseable(input.to_string());

    if let Some(epoch) = input.strip_prefix('@') {
        let seconds = epoch.parse::<i64>().map_err(|_| unparseable())?;
        return from_epoch(seconds);
    }

    if let Some(relative) = input.strip_prefix('+') {
        let seconds = parse_relative(relative).ok_or_else(unparseable)?;
        return Duration::try_seconds(seconds)
            .and_then(|span| now.checked_add_signed(span))
            .ok_or_else(unparseable);
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(unparseable);
    }

    Err(unparseable())
}

fn parse_relative(relative: &str) -> Option<i64> {
    let (digits, unit) = match relative.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&relative[..idx], c),
        _ => (relative, 's'),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount = digits.parse::<i64>().ok()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        _ => return None,
    };
    amount.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_to_epoch() {
        assert_eq!(CalendarDeadline::date(1970, 1, 1).to_epoch().unwrap(), 0);
        assert_eq!(
            CalendarDeadline::date(2000, 3, 1)
                .at(12, 30, 15)
                .to_epoch()
                .unwrap(),
            951_913_815
        );
    }

    #[test]
    fn test_invalid_calendar_date() {
        let err = CalendarDeadline::date(2023, 2, 29).to_instant().unwrap_err();
        assert!(matches!(err, DeadlineError::InvalidDate { month: 2, day: 29, .. }));
        assert!(CalendarDeadline::date(2024, 1, 1)
            .at(24, 0, 0)
            .to_instant()
            .is_err());
    }

    #[test]
    fn test_meets_deadline_is_inclusive() {
        let now = from_epoch(1_000).unwrap();
        assert!(meets_deadline(now, 300, from_epoch(1_300).unwrap()));
        assert!(!meets_deadline(now, 301, from_epoch(1_300).unwrap()));
        assert!(!meets_deadline(now, u64::MAX, from_epoch(i64::from(i32::MAX)).unwrap()));
    }

    #[test]
    fn test_parse_forms() {
        let now = from_epoch(1_000).unwrap();

        assert_eq!(parse_deadline("@86400", now).unwrap().timestamp(), 86_400);
        assert_eq!(parse_deadline("+60", now).unwrap().timestamp(), 1_060);
        assert_eq!(parse_deadline("+2h", now).unwrap().timestamp(), 8_200);
        assert_eq!(parse_deadline("+1d", now).unwrap().timestamp(), 87_400);
        assert_eq!(parse_deadline("1970-01-02", now).unwrap().timestamp(), 86_400);
        assert_eq!(
            parse_deadline("1970-01-01 01:00", now).unwrap().timestamp(),
            3_600
        );
        assert_eq!(
            parse_deadline("1970-01-01T00:00:30", now).unwrap().timestamp(),
            30
        );
        assert_eq!(
            parse_deadline("1970-01-01T02:00:00+01:00", now)
                .unwrap()
                .timestamp(),
            3_600
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let now = Utc::now();
        assert!(parse_deadline("tomorrow", now).is_err());
        assert!(parse_deadline("+5w", now).is_err());
        assert!(parse_deadline("+-5m", now).is_err());
        assert!(parse_deadline("+-60", now).is_err());
        assert!(parse_deadline("++60", now).is_err());
        assert!(parse_deadline("@soon", now).is_err());
        assert!(parse_deadline("2023-02-30", now).is_err());
    }
}
