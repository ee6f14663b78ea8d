use std::cmp::Ordering;

use crate::selector::Selector;
use crate::types::{ForecastRow, ReportQuery};

/// Highest projected demand first; ties by style id.
#[derive(Default)]
pub struct DemandSelector {
    pub limit: Option<usize>,
}

impl DemandSelector {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit }
    }
}

impl Selector<ReportQuery, ForecastRow> for DemandSelector {
    fn score(&self, candidate: &ForecastRow) -> f64 {
        candidate.projected_demand as f64
    }

    fn tie_break(&self, a: &ForecastRow, b: &ForecastRow) -> Ordering {
        a.style_id.cmp(&b.style_id)
    }

    fn size(&self) -> Option<usize> {
        self.limit
    }
}
