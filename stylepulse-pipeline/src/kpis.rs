use std::collections::BTreeMap;

use chrono::NaiveDate;

use stylepulse_engine::{ClassificationFlags, DateWindow, EventStore, StyleStatus};

use crate::types::KpiSummary;
use crate::util::ratio;

/// Headline numbers over `[as_of - 30, as_of]`.
///
/// Orders count sale rows, returns count return rows, both by event date.
/// Active styles are those whose status is `Active`.
pub fn summarize(
    store: &EventStore,
    flags: &BTreeMap<String, ClassificationFlags>,
    as_of: NaiveDate,
) -> KpiSummary {
    let window = DateWindow::performance(as_of);

    let mut orders = 0u64;
    let mut gmv_cents = 0i64;
    for sale in store.sales.iter().filter(|s| window.contains(s.date)) {
        orders += u64::from(sale.quantity);
        gmv_cents = gmv_cents.saturating_add(sale.amount_cents.unwrap_or(0));
    }
    let returns = store
        .returns
        .iter()
        .filter(|r| window.contains(r.date))
        .count() as u64;

    KpiSummary {
        window_start: window.start,
        window_end: window.last_day(),
        orders,
        gmv_cents,
        returns,
        return_rate: ratio(returns, orders),
        active_styles: flags
            .values()
            .filter(|f| f.status == StyleStatus::Active)
            .count(),
        styles_tracked: flags.len(),
    }
}
