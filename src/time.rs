//! # Time Decoding
//!
//! CF-style time coordinates store offsets from an epoch, described by a
//! `units` attribute such as `days since 1800-1-1 00:00:00`. This module parses
//! that attribute and turns raw offsets into calendar dates on the proleptic
//! Gregorian calendar.

use crate::error::{Nc2GifError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// Unit of a CF time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => Some(Self::Days),
            "hours" | "hour" | "hrs" | "hr" | "h" => Some(Self::Hours),
            "minutes" | "minute" | "mins" | "min" => Some(Self::Minutes),
            "seconds" | "second" | "secs" | "sec" | "s" => Some(Self::Seconds),
            _ => None,
        }
    }

    fn millis(self) -> f64 {
        match self {
            Self::Days => 86_400_000.0,
            Self::Hours => 3_600_000.0,
            Self::Minutes => 60_000.0,
            Self::Seconds => 1_000.0,
        }
    }
}

/// Parsed `"<unit> since <epoch>"` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: NaiveDateTime,
}

impl TimeUnits {
    /// Parses a CF units string.
    ///
    /// ```rust
    /// use nc2gif::time::{TimeUnit, TimeUnits};
    ///
    /// let units = TimeUnits::parse("days since 1800-1-1 00:00:00")?;
    /// assert_eq!(units.unit, TimeUnit::Days);
    /// assert_eq!(units.year_string(31.0)?, "1800");
    /// # Ok::<(), nc2gif::error::Nc2GifError>(())
    /// ```
    pub fn parse(units: &str) -> Result<Self> {
        let malformed = || Nc2GifError::TimeUnits(format!("malformed units '{}'", units));

        let trimmed = units.trim();
        let lower = trimmed.to_ascii_lowercase();
        let since = lower.find(" since ").ok_or_else(malformed)?;
        let unit_str = trimmed[..since].trim();
        let epoch_str = trimmed[since + " since ".len()..].trim();

        let unit = TimeUnit::parse(unit_str).ok_or_else(|| {
            Nc2GifError::TimeUnits(format!("unsupported time unit '{}' in '{}'", unit_str, units))
        })?;
        let epoch = parse_epoch(epoch_str).ok_or_else(malformed)?;

        Ok(Self { unit, epoch })
    }

    /// Converts a raw offset into a calendar date-time.
    pub fn decode(&self, value: f64) -> Result<NaiveDateTime> {
        if !value.is_finite() {
            return Err(Nc2GifError::TimeUnits(format!(
                "time value {} is not finite",
                value
            )));
        }
        let millis = (value * self.unit.millis()).round();
        if millis.abs() >= i64::MAX as f64 {
            return Err(Nc2GifError::TimeUnits(format!(
                "time value {} is out of range",
                value
            )));
        }
        TimeDelta::try_milliseconds(millis as i64)
            .and_then(|delta| self.epoch.checked_add_signed(delta))
            .ok_or_else(|| {
                Nc2GifError::TimeUnits(format!("time value {} is out of range", value))
            })
    }

    /// Four-digit year of a raw offset.
    pub fn year_string(&self, value: f64) -> Result<String> {
        let date = self.decode(value)?;
        Ok(format!("{:04}", date.year()))
    }
}

/// Decodes every time value into its four-digit year.
pub fn year_strings(values: &[f64], units: &TimeUnits) -> Result<Vec<String>> {
    values.iter().map(|&v| units.year_string(v)).collect()
}

fn parse_epoch(s: &str) -> Option<NaiveDateTime> {
    let s = s
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim();
    let (date_part, time_part) = match s.find(|c: char| c == ' ' || c == 'T') {
        Some(pos) => (&s[..pos], s[pos + 1..].trim()),
        None => (s, ""),
    };

    let mut fields = date_part.splitn(3, '-');
    let year: i32 = fields.next()?.trim().parse().ok()?;
    let month: u32 = fields.next().unwrap_or("1").trim().parse().ok()?;
    let day: u32 = fields.next().unwrap_or("1").trim().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let time = if time_part.is_empty() {
        NaiveTime::MIN
    } else {
        parse_clock(time_part)?
    };
    Some(date.and_time(time))
}

fn parse_clock(s: &str) -> Option<NaiveTime> {
    let mut fields = s.split(':');
    let hour: u32 = fields.next()?.trim().parse().ok()?;
    let minute: u32 = fields.next().unwrap_or("0").trim().parse().ok()?;
    let seconds: f64 = fields.next().unwrap_or("0").trim().parse().ok()?;
    if fields.next().is_some() || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    let whole = seconds.trunc() as u32;
    let nanos = ((seconds - seconds.trunc()) * 1e9).round() as u32;
    NaiveTime::from_hms_nano_opt(hour, minute, whole, nanos.min(999_999_999))
}
