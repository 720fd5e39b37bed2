//! Calendar month periods and the canonical keys used to aggregate by month.
//!
//! A [`Period`] is one calendar month. Its key is `"YYYY-MM"`; meal dates use the
//! `"YYYY-MM-DD"` form, so a date belongs to a period exactly when its key starts
//! with the period key. Timestamps are bucketed by their UTC calendar month.

use crate::errors::{Error, Result};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Latest representable year, so every key has a four digit year
pub const MAX_YEAR: i32 = 9999;

/// One calendar month between `0000-01` and `9999-12`, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    first_day: NaiveDate,
}

impl Period {
    /// Builds the period for `year` (0-9999) and `month` (1-12).
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .filter(|_| (0..=MAX_YEAR).contains(&year))
            .map(|first_day| Self { first_day })
            .ok_or_else(|| Error::InvalidPeriod {
                value: format!("{year:04}-{month:02}"),
            })
    }

    /// The month containing `date`, clamped to the representable years.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year().clamp(0, MAX_YEAR);
        let month = match year.cmp(&date.year()) {
            Ordering::Equal => date.month(),
            Ordering::Greater => 1,
            Ordering::Less => 12,
        };
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date);
        Self { first_day }
    }

    /// The UTC calendar month containing `timestamp`.
    #[must_use]
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self::from_date(timestamp.date_naive())
    }

    /// The current UTC month.
    #[must_use]
    pub fn current() -> Self {
        Self::from_timestamp(Utc::now())
    }

    /// Calendar year
    #[must_use]
    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    /// Calendar month, 1-12
    #[must_use]
    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    /// First day of the month
    #[must_use]
    pub const fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// Last day of the month
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.following_first_day()
            .pred_opt()
            .unwrap_or(self.first_day)
    }

    /// Canonical `"YYYY-MM"` key
    #[must_use]
    pub fn key(&self) -> String {
        self.first_day.format("%Y-%m").to_string()
    }

    /// Moves by `months` calendar months (negative moves back).
    ///
    /// Saturates at `0000-01` and `9999-12`.
    #[must_use]
    pub fn shift(&self, months: i32) -> Self {
        let step = Months::new(months.unsigned_abs());
        let shifted = if months >= 0 {
            self.first_day.checked_add_months(step)
        } else {
            self.first_day.checked_sub_months(step)
        };
        shifted
            .filter(|first_day| (0..=MAX_YEAR).contains(&first_day.year()))
            .map_or(*self, |first_day| Self { first_day })
    }

    /// The following calendar month
    #[must_use]
    pub fn next(&self) -> Self {
        self.shift(1)
    }

    /// The preceding calendar month
    #[must_use]
    pub fn previous(&self) -> Self {
        self.shift(-1)
    }

    /// Start of the month as a UTC instant (inclusive)
    #[must_use]
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.first_day.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Start of the following month as a UTC instant (exclusive end)
    #[must_use]
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.following_first_day()
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
    }

    /// Whether `date` falls inside this month
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    // Unlike `next`, not capped at the last representable month.
    fn following_first_day(&self) -> NaiveDate {
        self.first_day
            .checked_add_months(Months::new(1))
            .unwrap_or(self.first_day)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first_day.format("%Y-%m"))
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidPeriod {
            value: s.to_string(),
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let digits = |part: &str, len: usize| {
            part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(year, 4) || !digits(month, 2) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Period {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.key()
    }
}

/// Canonical `"YYYY-MM-DD"` key for a meal date
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
