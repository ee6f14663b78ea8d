use crate::filter::{Filter, FilterResult};
use crate::types::{ReportQuery, WatchlistRow};

/// Splits flagged styles into the watchlist and the dormant list using the
/// classifier's `on_watchlist` verdict (sold inside the 30-day performance
/// window).
#[derive(Debug, Default)]
pub struct ActivityWindowFilter;

impl Filter<ReportQuery, WatchlistRow> for ActivityWindowFilter {
    fn filter(
        &self,
        _query: &ReportQuery,
        candidates: Vec<WatchlistRow>,
    ) -> Result<FilterResult<WatchlistRow>, String> {
        Ok(FilterResult::partition(candidates, |c| c.on_watchlist))
    }
}
