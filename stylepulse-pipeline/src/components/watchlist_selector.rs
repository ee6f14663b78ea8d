use std::cmp::Ordering;

use crate::selector::Selector;
use crate::types::{ReportQuery, WatchlistRow};

/// Orders watchlist rows by staleness: longest without a sale first (never
/// sold counts as infinitely stale), then highest return rate, then style id.
#[derive(Default)]
pub struct WatchlistSelector {
    pub limit: Option<usize>,
}

impl WatchlistSelector {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit }
    }
}

impl Selector<ReportQuery, WatchlistRow> for WatchlistSelector {
    fn score(&self, candidate: &WatchlistRow) -> f64 {
        candidate
            .age_since_last_sale
            .map(|age| age as f64)
            .unwrap_or(f64::INFINITY)
    }

    fn tie_break(&self, a: &WatchlistRow, b: &WatchlistRow) -> Ordering {
        b.return_rate
            .total_cmp(&a.return_rate)
            .then_with(|| a.style_id.cmp(&b.style_id))
    }

    fn size(&self) -> Option<usize> {
        self.limit
    }
}
