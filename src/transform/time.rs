//! Local-time policy and timestamp decomposition
//!
//! Event times arrive as epoch milliseconds. They are rendered as local
//! wall-clock strings in an explicitly configured fixed-offset zone; the
//! ambient process time zone is never consulted.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, Timelike, Utc};

/// Format of the derived `timestamp` column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the derived `datetime` column
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fixed-offset time zone used to derive local times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePolicy {
    offset: FixedOffset,
}

impl Default for TimePolicy {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimePolicy {
    /// UTC policy
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Policy with an explicit offset
    pub fn from_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Parse `UTC`, `Z`, `+HH:MM`, `-HH:MM`, `+HHMM` or `+HH`
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::timezone(value, "time zone policy is unset"));
        }
        if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
            return Ok(Self::utc());
        }

        let (sign, rest) = match trimmed.as_bytes()[0] {
            b'+' => (1, &trimmed[1..]),
            b'-' => (-1, &trimmed[1..]),
            _ => {
                return Err(Error::timezone(
                    value,
                    "expected UTC or a fixed offset such as +05:30",
                ))
            }
        };

        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !(digits.len() == 2 || digits.len() == 4) || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::timezone(value, "malformed offset"));
        }

        let hours: i32 = digits[..2]
            .parse()
            .map_err(|_| Error::timezone(value, "malformed hours"))?;
        let minutes: i32 = if digits.len() == 4 {
            digits[2..]
                .parse()
                .map_err(|_| Error::timezone(value, "malformed minutes"))?
        } else {
            0
        };
        if minutes >= 60 {
            return Err(Error::timezone(value, "minutes out of range"));
        }

        let seconds = sign * (hours * 3600 + minutes * 60);
        let offset = FixedOffset::east_opt(seconds)
            .ok_or_else(|| Error::timezone(value, "offset out of range"))?;
        Ok(Self { offset })
    }

    /// The configured offset
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Local wall-clock time of an epoch-millisecond instant, truncated to seconds
    pub fn local(&self, ts_millis: i64) -> Result<NaiveDateTime> {
        let seconds = ts_millis.div_euclid(1000);
        let utc = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            Error::Other(format!("Event time {ts_millis} is out of range"))
        })?;
        Ok(utc.with_timezone(&self.offset).naive_local())
    }

    /// Derived `timestamp` and `datetime` strings for an event time
    pub fn derive(&self, ts_millis: i64) -> Result<(String, String)> {
        let local = self.local(ts_millis)?;
        Ok((
            local.format(TIMESTAMP_FORMAT).to_string(),
            local.format(DATE_FORMAT).to_string(),
        ))
    }
}

impl std::fmt::Display for TimePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.offset.local_minus_utc() == 0 {
            write!(f, "UTC")
        } else {
            write!(f, "{}", self.offset)
        }
    }
}

/// Calendar fields of the time dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    pub hour: i32,
    pub day_of_month: i32,
    /// ISO-8601 week number
    pub week_of_year: i32,
    pub month: i32,
    pub year: i32,
    /// 1 = Sunday ... 7 = Saturday
    pub day_of_week: i32,
}

impl TimeParts {
    /// Decompose a derived `timestamp` / `datetime` pair
    ///
    /// The hour comes from the timestamp, everything else from the date.
    pub fn from_derived(timestamp: &str, date: &str) -> Result<Self> {
        let time = parse_timestamp(timestamp)?;
        let date = parse_date(date)?;
        Ok(Self {
            hour: time.hour() as i32,
            day_of_month: date.day() as i32,
            week_of_year: date.iso_week().week() as i32,
            month: date.month() as i32,
            year: date.year(),
            day_of_week: date.weekday().number_from_sunday() as i32,
        })
    }
}

/// Parse a derived `timestamp` value
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|e| Error::Other(format!("Invalid timestamp '{value}': {e}")))
}

/// Parse a derived `datetime` value
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| Error::Other(format!("Invalid date '{value}': {e}")))
}

/// Year and month of a derived `datetime` value
pub fn year_month(date: &str) -> Result<(i32, i32)> {
    let date = parse_date(date)?;
    Ok((date.year(), date.month() as i32))
}
