//! Half-open calendar-day windows.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::thresholds::PERFORMANCE_WINDOW_DAYS;

/// Days in `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `[as_of - days, as_of]`, as-of date included.
    pub fn trailing_inclusive(as_of: NaiveDate, days: u64) -> Self {
        Self::new(days_before(as_of, days), days_after(as_of, 1))
    }

    /// `[as_of - days, as_of)`, as-of date excluded.
    pub fn lookback(as_of: NaiveDate, days: u64) -> Self {
        Self::new(days_before(as_of, days), as_of)
    }

    /// The 30-day performance window `[as_of - 30, as_of]`.
    pub fn performance(as_of: NaiveDate) -> Self {
        Self::trailing_inclusive(as_of, PERFORMANCE_WINDOW_DAYS)
    }

    /// The performance window before [`DateWindow::performance`]:
    /// `[as_of - 60, as_of - 30)`.
    pub fn previous_performance(as_of: NaiveDate) -> Self {
        Self::lookback(days_before(as_of, PERFORMANCE_WINDOW_DAYS), PERFORMANCE_WINDOW_DAYS)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Last day inside the window.
    pub fn last_day(&self) -> NaiveDate {
        days_before(self.end, 1)
    }
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

fn days_after(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn performance_window_includes_both_ends() {
        let w = DateWindow::performance(ymd(2024, 3, 31));
        assert!(w.contains(ymd(2024, 3, 1)));
        assert!(w.contains(ymd(2024, 3, 31)));
        assert!(!w.contains(ymd(2024, 2, 29)));
        assert!(!w.contains(ymd(2024, 4, 1)));
        assert_eq!(w.last_day(), ymd(2024, 3, 31));
    }

    #[test]
    fn previous_window_stops_before_the_current_one() {
        let as_of = ymd(2024, 3, 31);
        let prev = DateWindow::previous_performance(as_of);
        assert_eq!(prev.start, ymd(2024, 1, 31));
        assert_eq!(prev.end, ymd(2024, 3, 1));
        assert!(!prev.contains(ymd(2024, 3, 1)));
        assert!(prev.contains(ymd(2024, 2, 29)));
    }

    #[test]
    fn lookback_excludes_as_of() {
        let w = DateWindow::lookback(ymd(2024, 1, 31), 30);
        assert!(w.contains(ymd(2024, 1, 1)));
        assert!(w.contains(ymd(2024, 1, 30)));
        assert!(!w.contains(ymd(2024, 1, 31)));
    }
}
