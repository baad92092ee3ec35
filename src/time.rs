//! CF time units and model calendars
//!
//! Fragments of one series can carry different reference dates
//! (`days since 1988-01-01` vs `days since 1988-02-01`), and climate models
//! commonly run on a 360-day calendar. Values are rebased through an
//! absolute day count per calendar.

use crate::errors::{MonitorError, Result};
use chrono::{Datelike, NaiveDate};

/// Supported CF calendars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    Standard,
    Day360,
    NoLeap,
}

impl Calendar {
    pub fn parse(name: Option<&str>) -> Result<Self> {
        match name.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None
            | Some("")
            | Some("standard")
            | Some("gregorian")
            | Some("proleptic_gregorian") => Ok(Calendar::Standard),
            Some("360_day") => Ok(Calendar::Day360),
            Some("365_day") | Some("noleap") | Some("no_leap") => Ok(Calendar::NoLeap),
            Some(other) => Err(MonitorError::Time(format!("unsupported calendar '{other}'"))),
        }
    }
}

const NOLEAP_MONTH_START: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// A calendar date-time without time zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Seconds into the day
    pub seconds: f64,
}

impl CfDate {
    /// Parses `YYYY-MM-DD[ hh:mm:ss]` (also `T` separated, trailing zone ignored)
    pub fn parse(text: &str) -> Result<Self> {
        let bad = || MonitorError::Time(format!("unparseable reference date '{text}'"));
        let text = text.trim();
        let (date_part, time_part) = match text.split_once(['T', ' ']) {
            Some((d, t)) => (d, Some(t.trim())),
            None => (text, None),
        };
        let mut ymd = date_part.splitn(3, '-');
        let year: i32 = ymd.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
        let month: u32 = ymd.next().map_or(Some(1), |s| s.parse().ok()).ok_or_else(bad)?;
        let day: u32 = ymd.next().map_or(Some(1), |s| s.parse().ok()).ok_or_else(bad)?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(bad());
        }

        let mut seconds = 0.0;
        if let Some(time) = time_part {
            let clock = time
                .split(|c: char| c == 'Z' || c == '+' || c == ' ')
                .next()
                .unwrap_or("");
            for (i, piece) in clock.split(':').take(3).enumerate() {
                if piece.is_empty() {
                    continue;
                }
                let value: f64 = piece.parse().map_err(|_| bad())?;
                seconds += value * [3600.0, 60.0, 1.0][i];
            }
        }
        Ok(Self {
            year,
            month,
            day,
            seconds,
        })
    }

    /// Whole days since the calendar's epoch (year 0 / 0001-01-01)
    fn day_number(&self, calendar: Calendar) -> Result<i64> {
        match calendar {
            Calendar::Standard => NaiveDate::from_ymd_opt(self.year, self.month, self.day)
                .map(|d| i64::from(d.num_days_from_ce()))
                .ok_or_else(|| {
                    MonitorError::Time(format!(
                        "invalid date {}-{}-{}",
                        self.year, self.month, self.day
                    ))
                }),
            Calendar::Day360 => Ok(i64::from(self.year) * 360
                + i64::from(self.month - 1) * 30
                + i64::from(self.day - 1)),
            Calendar::NoLeap => Ok(i64::from(self.year) * 365
                + NOLEAP_MONTH_START[(self.month - 1) as usize]
                + i64::from(self.day - 1)),
        }
    }

    /// Absolute (fractional) day count under `calendar`
    pub fn to_days(&self, calendar: Calendar) -> Result<f64> {
        Ok(self.day_number(calendar)? as f64 + self.seconds / 86_400.0)
    }

    /// Inverse of [`CfDate::to_days`]
    pub fn from_days(days: f64, calendar: Calendar) -> Result<Self> {
        let whole = days.floor();
        let seconds = (days - whole) * 86_400.0;
        let whole = whole as i64;
        let (year, month, day) = match calendar {
            Calendar::Standard => {
                let date = i32::try_from(whole)
                    .ok()
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .ok_or_else(|| MonitorError::Time(format!("day {whole} out of range")))?;
                (date.year(), date.month(), date.day())
            }
            Calendar::Day360 => {
                let year = whole.div_euclid(360);
                let rem = whole.rem_euclid(360);
                (year as i32, (rem / 30 + 1) as u32, (rem % 30 + 1) as u32)
            }
            Calendar::NoLeap => {
                let year = whole.div_euclid(365);
                let rem = whole.rem_euclid(365);
                let month = NOLEAP_MONTH_START
                    .iter()
                    .rposition(|&start| start <= rem)
                    .unwrap_or(0);
                (
                    year as i32,
                    month as u32 + 1,
                    (rem - NOLEAP_MONTH_START[month] + 1) as u32,
                )
            }
        };
        Ok(Self {
            year,
            month,
            day,
            seconds,
        })
    }
}

/// Parsed `<unit> since <reference>` units with their calendar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    /// Length of one unit in days
    pub unit_days: f64,
    pub reference: CfDate,
    pub calendar: Calendar,
}

impl TimeUnits {
    pub fn parse(units: &str, calendar: Option<&str>) -> Result<Self> {
        let (unit, reference) = units
            .split_once(" since ")
            .ok_or_else(|| MonitorError::Time(format!("'{units}' is not a time unit")))?;
        let unit_days = match unit.trim().to_ascii_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0 / 86_400.0,
            "minutes" | "minute" | "mins" | "min" => 1.0 / 1_440.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 1.0 / 24.0,
            "days" | "day" | "d" => 1.0,
            other => return Err(MonitorError::Time(format!("unsupported time unit '{other}'"))),
        };
        Ok(Self {
            unit_days,
            reference: CfDate::parse(reference)?,
            calendar: Calendar::parse(calendar)?,
        })
    }

    /// Absolute day count of a value in these units
    pub fn absolute_days(&self, value: f64) -> Result<f64> {
        Ok(self.reference.to_days(self.calendar)? + value * self.unit_days)
    }

    /// Value in these units of an absolute day count
    pub fn from_absolute_days(&self, days: f64) -> Result<f64> {
        Ok((days - self.reference.to_days(self.calendar)?) / self.unit_days)
    }

    /// Re-expresses `value` (in `self`) in `target` units
    pub fn rebase(&self, value: f64, target: &TimeUnits) -> Result<f64> {
        target.from_absolute_days(self.absolute_days(value)?)
    }

    /// `(year, month)` a value falls in
    pub fn year_month(&self, value: f64) -> Result<(i32, u32)> {
        let date = CfDate::from_days(self.absolute_days(value)?, self.calendar)?;
        Ok((date.year, date.month))
    }
}
