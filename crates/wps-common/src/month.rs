//! Calendar month handling for month-by-month processing runs.

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Years accepted by [`YearMonth::new`]. Timestamps are written with a
/// four digit year and a month's window ends at the first instant of the
/// following month, so December of the last year must still roll into a
/// four digit year.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9998;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonthError {
    #[error("Month out of range: {0} (expected 1-12)")]
    InvalidMonth(u32),

    #[error("Year out of range: {0} (expected 1-9998)")]
    InvalidYear(i32),

    #[error("Range end {end} is before range start {start}")]
    Reversed { start: YearMonth, end: YearMonth },
}

/// A calendar month, e.g. 2020-12.
///
/// Stored as the first day of the month so ordering and arithmetic come
/// straight from chrono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, MonthError> {
        if !(1..=12).contains(&month) {
            return Err(MonthError::InvalidMonth(month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(MonthError::InvalidYear(year));
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or(MonthError::InvalidYear(year))
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// The following month; December rolls over into January of the next year.
    pub fn next(self) -> Self {
        Self(self.0 + Months::new(1))
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    /// Last calendar day of the month (leap years included).
    pub fn last_day(self) -> NaiveDate {
        self.next().0 - Days::new(1)
    }

    /// Midnight on the first day of the month.
    pub fn first_instant(self) -> NaiveDateTime {
        self.0.and_time(NaiveTime::MIN)
    }

    /// `YYYYMM`, the form ERA5 file names embed.
    pub fn compact(self) -> String {
        self.0.format("%Y%m").to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

/// Inclusive range of months processed by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    start: YearMonth,
    end: YearMonth,
}

impl MonthRange {
    pub fn new(start: YearMonth, end: YearMonth) -> Result<Self, MonthError> {
        if end < start {
            return Err(MonthError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a range from the classic `start_year/start_month/end_month`
    /// triple. `end_year` defaults to `start_year`.
    pub fn from_parts(
        start_year: i32,
        start_month: u32,
        end_year: Option<i32>,
        end_month: u32,
    ) -> Result<Self, MonthError> {
        let start = YearMonth::new(start_year, start_month)?;
        let end = YearMonth::new(end_year.unwrap_or(start_year), end_month)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn end(&self) -> YearMonth {
        self.end
    }

    /// Number of months in the range (always at least one).
    pub fn len(&self) -> usize {
        let years = (self.end.year() - self.start.year()) as i64;
        let months = years * 12 + self.end.month() as i64 - self.start.month() as i64;
        (months + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.start <= month && month <= self.end
    }

    pub fn iter(&self) -> MonthIter {
        MonthIter {
            next: Some(self.start),
            end: self.end,
        }
    }
}

impl IntoIterator for &MonthRange {
    type Item = YearMonth;
    type IntoIter = MonthIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for MonthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Iterator over the months of a [`MonthRange`].
#[derive(Debug, Clone)]
pub struct MonthIter {
    next: Option<YearMonth>,
    end: YearMonth,
}

impl Iterator for MonthIter {
    type Item = YearMonth;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if current < self.end {
            Some(current.next())
        } else {
            None
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_rejects_invalid_month() {
        assert_eq!(YearMonth::new(2020, 0), Err(MonthError::InvalidMonth(0)));
        assert_eq!(YearMonth::new(2020, 13), Err(MonthError::InvalidMonth(13)));
    }

    #[test]
    fn test_rejects_invalid_year() {
        assert_eq!(YearMonth::new(0, 1), Err(MonthError::InvalidYear(0)));
        assert_eq!(YearMonth::new(10000, 1), Err(MonthError::InvalidYear(10000)));
        assert_eq!(YearMonth::new(9999, 12), Err(MonthError::InvalidYear(9999)));
    }

    #[test]
    fn test_next_rolls_over_year() {
        assert_eq!(ym(2020, 12).next(), ym(2021, 1));
        assert_eq!(ym(2020, 6).next(), ym(2020, 7));
    }

    #[test]
    fn test_last_day() {
        assert_eq!(ym(2020, 2).last_day().day(), 29);
        assert_eq!(ym(2021, 2).last_day().day(), 28);
        assert_eq!(ym(1900, 2).last_day().day(), 28);
        assert_eq!(ym(2000, 2).last_day().day(), 29);
        assert_eq!(ym(2020, 4).last_day().day(), 30);
        assert_eq!(ym(2020, 12).last_day().to_string(), "2020-12-31");
    }

    #[test]
    fn test_formatting() {
        assert_eq!(ym(2020, 3).to_string(), "2020-03");
        assert_eq!(ym(2020, 3).compact(), "202003");
        assert_eq!(
            ym(2020, 3).first_instant().to_string(),
            "2020-03-01 00:00:00"
        );
    }

    #[test]
    fn test_single_month_range() {
        let range = MonthRange::from_parts(2020, 12, None, 12).unwrap();
        let months: Vec<_> = range.iter().collect();
        assert_eq!(months, vec![ym(2020, 12)]);
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn test_range_across_year_boundary() {
        let range = MonthRange::from_parts(2020, 11, Some(2021), 2).unwrap();
        let months: Vec<String> = range.iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2020-11", "2020-12", "2021-01", "2021-02"]);
        assert_eq!(range.len(), 4);
        assert!(range.contains(ym(2021, 1)));
        assert!(!range.contains(ym(2021, 3)));
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = MonthRange::from_parts(2020, 12, None, 11).unwrap_err();
        assert!(matches!(err, MonthError::Reversed { .. }));
    }

    #[test]
    fn test_range_ending_in_last_supported_year() {
        let range = MonthRange::from_parts(9998, 11, None, 12).unwrap();
        assert_eq!(range.iter().count(), 2);
        assert_eq!(
            range.end().next().first_instant().format("%Y-%m-%d").to_string(),
            "9999-01-01"
        );
    }
}
