use std::cmp::Ordering;

use crate::util;

/// Orders a report's rows and optionally caps how many are kept.
///
/// Implementors supply a numeric `score` (higher first) and a `tie_break`
/// that ends on a unique key, so a report never depends on input order.
pub trait Selector<Q, C>: Send + Sync {
    /// Order the rows, then cut the list to `size()` when one is set.
    fn select(&self, _query: &Q, candidates: Vec<C>) -> Vec<C> {
        let mut rows = self.sort(candidates);
        if let Some(limit) = self.size() {
            rows.truncate(limit);
        }
        rows
    }

    /// Primary sort key, descending.
    fn score(&self, candidate: &C) -> f64;

    /// Ordering among rows whose scores compare equal.
    fn tie_break(&self, _a: &C, _b: &C) -> Ordering {
        Ordering::Equal
    }

    /// Descending by score, then `tie_break`. `+inf` ranks above every
    /// finite score and NaN ranks below everything.
    fn sort(&self, candidates: Vec<C>) -> Vec<C> {
        let mut rows = candidates;
        rows.sort_by(|a, b| {
            let (sa, sb) = (self.score(a), self.score(b));
            let by_score = match (sa.is_nan(), sb.is_nan()) {
                (false, false) => sb.partial_cmp(&sa).unwrap_or(Ordering::Equal),
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (true, true) => Ordering::Equal,
            };
            by_score.then_with(|| self.tie_break(a, b))
        });
        rows
    }

    /// Row cap; `None` keeps every row.
    fn size(&self) -> Option<usize> {
        None
    }

    /// Type name without the module path, for log lines.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ByValue {
        limit: Option<usize>,
    }

    impl Selector<(), (&'static str, f64)> for ByValue {
        fn score(&self, candidate: &(&'static str, f64)) -> f64 {
            candidate.1
        }

        fn tie_break(&self, a: &(&'static str, f64), b: &(&'static str, f64)) -> Ordering {
            a.0.cmp(b.0)
        }

        fn size(&self) -> Option<usize> {
            self.limit
        }
    }

    #[test]
    fn nan_last_infinity_first_ties_by_key() {
        let selector = ByValue { limit: None };
        let rows = vec![
            ("nan", f64::NAN),
            ("b", 2.0),
            ("inf", f64::INFINITY),
            ("a", 2.0),
        ];
        let sorted: Vec<&str> = selector.select(&(), rows).into_iter().map(|r| r.0).collect();
        assert_eq!(sorted, vec!["inf", "a", "b", "nan"]);
    }

    #[test]
    fn size_truncates() {
        let selector = ByValue { limit: Some(1) };
        let selected = selector.select(&(), vec![("a", 1.0), ("b", 3.0)]);
        assert_eq!(selected, vec![("b", 3.0)]);
    }
}
