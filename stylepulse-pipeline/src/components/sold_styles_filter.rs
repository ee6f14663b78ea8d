use crate::filter::{Filter, FilterResult};
use crate::types::{ForecastRow, ReportQuery};

/// Drops forecast rows for styles that never sold (catalog-only or
/// returns-only styles have no demand history to project).
#[derive(Default)]
pub struct SoldStylesFilter;

impl Filter<ReportQuery, ForecastRow> for SoldStylesFilter {
    fn filter(
        &self,
        _query: &ReportQuery,
        candidates: Vec<ForecastRow>,
    ) -> Result<FilterResult<ForecastRow>, String> {
        Ok(FilterResult::partition(candidates, |c| c.total_units_sold > 0))
    }
}
