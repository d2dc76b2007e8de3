//! Calendar codec: converts between [`TimeValue`] seconds and calendar dates.
//!
//! The calendar is proleptic Gregorian with no time zones, counted from
//! year 0, January 1, 00:00:00. Year 0 is a leap year under the 400 rule.

use std::fmt;

use serde::{Deserialize, Serialize};
use storyline_protocol::TimeValue;
use thiserror::Error;

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
pub const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Days in one full 400-year leap cycle.
const DAYS_PER_CYCLE: u64 = 146_097;
const YEARS_PER_CYCLE: u32 = 400;

/// Weekday of the epoch day, with 0 = Sunday. Tunable; year 0 Jan 1 is
/// treated as a Saturday.
pub const WEEKDAY_ANCHOR: i64 = 6;

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Error, PartialEq)]
pub enum CalendarError {
    #[error("invalid input: {seconds} is not a representable time value")]
    InvalidInput { seconds: f64 },
}

/// Decomposed form of a [`TimeValue`].
///
/// `decode` only ever produces dates whose fields are in range. Dates built
/// by hand are not checked; use [`CalendarDate::normalized`] before encoding
/// user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
}

impl CalendarDate {
    /// Midnight on the given day.
    pub fn ymd(year: u32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    pub fn with_time(self, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            hour,
            minute,
            second,
            ..self
        }
    }

    /// Clamp every field into its valid range: month to 1–12, day to the
    /// leap-aware month length, and the time of day to 23:59:59.
    pub fn normalized(self) -> Self {
        let month = self.month.clamp(1, 12);
        Self {
            year: self.year,
            month,
            day: self.day.clamp(1, days_in_month(self.year, month)),
            hour: self.hour.min(23),
            minute: self.minute.min(59),
            second: self.second.min(59),
        }
    }

    /// Three-letter month name. Out-of-range months are clamped.
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month.clamp(1, 12) - 1) as usize]
    }

    /// Weekday index, 0 = Sunday.
    pub fn weekday(&self) -> u32 {
        day_of_week(self.year, self.month, self.day)
    }

    pub fn weekday_name(&self) -> &'static str {
        WEEKDAY_NAMES[self.weekday() as usize]
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

pub fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1–12) of `year`; 0 for any other month.
pub fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        1..=12 => DAYS_IN_MONTH[(month - 1) as usize],
        _ => 0,
    }
}

pub fn days_in_year(year: u32) -> u64 {
    if is_leap_year(year) { 366 } else { 365 }
}

/// Convert seconds since the epoch into a calendar date.
///
/// Fractional seconds are truncated. Whole 400-year cycles are skipped in
/// one step; the remaining years and months are subtracted one at a time.
pub fn decode(seconds: TimeValue) -> Result<CalendarDate, CalendarError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(CalendarError::InvalidInput { seconds });
    }

    let mut remaining = seconds.floor() as u64;
    let cycle_seconds = DAYS_PER_CYCLE * SECONDS_PER_DAY;
    let cycles = remaining / cycle_seconds;
    remaining %= cycle_seconds;

    // Leap-ness repeats every cycle, so the scan works on the year within it.
    let mut year_in_cycle = 0;
    loop {
        let year_seconds = days_in_year(year_in_cycle) * SECONDS_PER_DAY;
        if remaining < year_seconds {
            break;
        }
        remaining -= year_seconds;
        year_in_cycle += 1;
    }

    let year = cycles
        .checked_mul(u64::from(YEARS_PER_CYCLE))
        .and_then(|y| y.checked_add(u64::from(year_in_cycle)))
        .and_then(|y| u32::try_from(y).ok())
        .ok_or(CalendarError::InvalidInput { seconds })?;

    let mut month = 1;
    loop {
        let month_seconds = u64::from(days_in_month(year, month)) * SECONDS_PER_DAY;
        if remaining < month_seconds {
            break;
        }
        remaining -= month_seconds;
        month += 1;
    }

    let day = remaining / SECONDS_PER_DAY;
    remaining %= SECONDS_PER_DAY;
    let hour = remaining / SECONDS_PER_HOUR;
    remaining %= SECONDS_PER_HOUR;
    let minute = remaining / SECONDS_PER_MINUTE;
    let second = remaining % SECONDS_PER_MINUTE;

    // Each component is bounded by the loop above (day < 31, hour < 24, ...).
    Ok(CalendarDate {
        year,
        month,
        day: day as u32 + 1,
        hour: hour as u32,
        minute: minute as u32,
        second: second as u32,
    })
}

/// Convert a calendar date into seconds since the epoch.
///
/// Exact inverse of [`decode`] for any date it produced. The date is not
/// validated: out-of-range fields are summed as given.
pub fn encode(date: CalendarDate) -> TimeValue {
    let days = days_before(date.year, date.month) + i64::from(date.day) - 1;
    let seconds = days * SECONDS_PER_DAY as i64
        + i64::from(date.hour) * SECONDS_PER_HOUR as i64
        + i64::from(date.minute) * SECONDS_PER_MINUTE as i64
        + i64::from(date.second);
    seconds as TimeValue
}

/// Days from the epoch to the given day (the epoch itself is day 0).
pub fn days_since_epoch(year: u32, month: u32, day: u32) -> i64 {
    days_before(year, month) + i64::from(day) - 1
}

/// Weekday of the given day, 0 = Sunday through 6 = Saturday.
pub fn day_of_week(year: u32, month: u32, day: u32) -> u32 {
    (days_since_epoch(year, month, day) + WEEKDAY_ANCHOR).rem_euclid(7) as u32
}

/// Days in all whole years before `year` plus all whole months before
/// `month` within it.
fn days_before(year: u32, month: u32) -> i64 {
    let cycles = u64::from(year / YEARS_PER_CYCLE);
    let mut days = cycles * DAYS_PER_CYCLE;
    days += (0..year % YEARS_PER_CYCLE).map(days_in_year).sum::<u64>();
    days += (1..month)
        .map(|m| u64::from(days_in_month(year, m)))
        .sum::<u64>();
    days as i64
}
