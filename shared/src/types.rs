//! Common types used across the ledger

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive date range for queries and reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, &'static str> {
        if start > end {
            return Err("Start date must not be after end date");
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending on `end`, e.g. the default 30-day report window
    pub fn trailing_days(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    /// Resolve optional bounds against a default window ending on `today`
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        default_days: i64,
    ) -> Result<Self, &'static str> {
        let end = end.unwrap_or(today);
        let start = start.unwrap_or_else(|| Self::trailing_days(end, default_days).start);
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_resolve_defaults_to_trailing_window() {
        let range = DateRange::resolve(None, None, day(12, 31), 30).unwrap();
        assert_eq!(range.start, day(12, 1));
        assert_eq!(range.end, day(12, 31));
        assert!(range.contains(day(12, 15)));
        assert!(!range.contains(day(11, 30)));
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(DateRange::new(day(5, 2), day(5, 1)).is_err());
    }
}
