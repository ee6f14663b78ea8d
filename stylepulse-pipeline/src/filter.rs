use crate::util;

/// Rows split by a filter. Removed rows are kept, not dropped: the watchlist
/// chain turns them into the dormant list.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult<C> {
    pub kept: Vec<C>,
    pub removed: Vec<C>,
}

impl<C> FilterResult<C> {
    /// Split `candidates` by `keep`, preserving input order on both sides.
    pub fn partition(candidates: Vec<C>, keep: impl FnMut(&C) -> bool) -> Self {
        let (kept, removed) = candidates.into_iter().partition(keep);
        Self { kept, removed }
    }
}

/// A report filter. Filters in a chain run in order, each seeing only the
/// rows the previous one kept.
pub trait Filter<Q, C>: Send + Sync {
    /// Decide if this filter should run for the given query.
    fn enable(&self, _query: &Q) -> bool {
        true
    }

    /// An `Err` aborts the whole report pass.
    fn filter(&self, query: &Q, candidates: Vec<C>) -> Result<FilterResult<C>, String>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}
