use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid period '{0}', expected YYYY-MM")]
pub struct ParsePeriodError(pub String);

/// A reporting month. One trial-balance export covers exactly one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Period { year, month })
    }

    /// Builds a period from the `M/YY` fragment of a column header.
    pub fn from_short(month: u32, two_digit_year: u32) -> Option<Self> {
        if two_digit_year > 99 {
            return None;
        }
        Period::new(2000 + two_digit_year as i32, month)
    }

    /// The month before, rolling January back to December of the previous year.
    pub fn prior_month(self) -> Self {
        if self.month == 1 {
            Period { year: self.year - 1, month: 12 }
        } else {
            Period { year: self.year, month: self.month - 1 }
        }
    }

    pub fn prior_year(self) -> Self {
        Period { year: self.year - 1, month: self.month }
    }

    pub fn start_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Last calendar day of the month (inclusive).
    pub fn end_date(self) -> Option<NaiveDate> {
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        next.and_then(|d| d.pred_opt())
    }
}

impl FromStr for Period {
    type Err = ParsePeriodError;

    /// Accepts `YYYY-MM` and `MM/YYYY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParsePeriodError(s.to_string());
        let (year, month) = if let Some((y, m)) = s.split_once('-') {
            (y, m)
        } else if let Some((m, y)) = s.split_once('/') {
            (y, m)
        } else {
            return Err(invalid());
        };
        if year.len() != 4 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Period::new(year, month).ok_or_else(invalid)
    }
}
