use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PainelError, Result};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month. Ordering is chronological (year first, then month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PainelError::Other(format!(
                "Invalid month: {month} (must be 1-12)"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::from_date(chrono::Local::now().date_naive())
    }

    /// Parse `YYYY-MM`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = || PainelError::Other(format!("Invalid period: {raw} (expected YYYY-MM)"));
        let (y, m) = raw.split_once('-').ok_or_else(invalid)?;
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }

    /// The calendar month immediately before this one.
    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    #[cfg(test)]
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn month_name(self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    /// `len` consecutive periods ending at and including `self`, oldest first.
    pub fn window_ending(self, len: usize) -> Vec<Period> {
        let mut periods = Vec::with_capacity(len);
        let mut cursor = self;
        for _ in 0..len {
            periods.push(cursor);
            cursor = cursor.previous();
        }
        periods.reverse();
        periods
    }

    /// The twelve months ending at `self`, used for trend displays.
    pub fn twelve_month_window(self) -> Vec<Period> {
        self.window_ending(12)
    }

    pub fn key(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_rolls_year_back_in_january() {
        let jan = Period::new(2024, 1).unwrap();
        assert_eq!(jan.previous(), Period::new(2023, 12).unwrap());
        let jun = Period::new(2024, 6).unwrap();
        assert_eq!(jun.previous(), Period::new(2024, 5).unwrap());
    }

    #[test]
    fn test_next_rolls_year_forward_in_december() {
        let dec = Period::new(2023, 12).unwrap();
        assert_eq!(dec.next(), Period::new(2024, 1).unwrap());
    }

    #[test]
    fn test_window_ending_march_starts_previous_april() {
        let end = Period::new(2024, 3).unwrap();
        let window = end.twelve_month_window();
        assert_eq!(window.len(), 12);
        assert_eq!(window[0], Period::new(2023, 4).unwrap());
        assert_eq!(window[11], end);
        for pair in window.windows(2) {
            assert!(pair[0] < pair[1], "not increasing: {:?}", pair);
            assert_eq!(pair[0].next(), pair[1]);
        }
    }

    #[test]
    fn test_window_ending_december_stays_in_year() {
        let window = Period::new(2024, 12).unwrap().twelve_month_window();
        assert!(window.iter().all(|p| p.year == 2024));
        assert_eq!(window[0].month, 1);
    }

    #[test]
    fn test_parse_and_key() {
        let p = Period::parse("2025-03").unwrap();
        assert_eq!(p.key(), "2025-03");
        assert_eq!(p.to_string(), "March 2025");
        assert!(Period::parse("2025-13").is_err());
        assert!(Period::parse("March 2025").is_err());
    }
}
