//! Event store → one `StyleAggregate` per style.
//!
//! Every fold here is a count, sum, min or max, so the result does not depend
//! on event order. Money stays in integer cents until presentation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::events::{CatalogEntry, ReturnEvent, ReturnType, SaleEvent};
use crate::window::DateWindow;

/// Return counts split by return type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReturnCounts {
    pub rto: u64,
    pub customer: u64,
    pub unknown: u64,
}

impl ReturnCounts {
    pub fn total(&self) -> u64 {
        self.rto + self.customer + self.unknown
    }

    /// Everything that is not RTO, unknown types included.
    pub fn non_rto(&self) -> u64 {
        self.customer + self.unknown
    }

    fn record(&mut self, return_type: ReturnType) {
        match return_type {
            ReturnType::Rto => self.rto += 1,
            ReturnType::CustomerReturn => self.customer += 1,
            ReturnType::Unknown => self.unknown += 1,
        }
    }

    fn add(mut self, other: &ReturnCounts) -> Self {
        self.rto += other.rto;
        self.customer += other.customer;
        self.unknown += other.unknown;
        self
    }
}

/// Per-style totals over the whole upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleAggregate {
    pub style_id: String,
    pub total_units_sold: u64,
    pub gmv_cents: i64,
    pub first_sale_date: Option<NaiveDate>,
    pub last_sale_date: Option<NaiveDate>,
    pub total_returns: u64,
    pub rto_count: u64,
    pub customer_return_count: u64,
    pub unknown_return_count: u64,
    /// `total_returns / total_units_sold`, 0 without sales. May exceed 1
    /// when returns reference sales older than the upload.
    pub return_rate: f64,
    pub in_catalog: bool,
    /// Units per calendar day, for windowed counts.
    #[serde(skip)]
    pub sales_by_day: BTreeMap<NaiveDate, u64>,
    #[serde(skip)]
    pub returns_by_day: BTreeMap<NaiveDate, ReturnCounts>,
    /// Returns per reason text. Rows without a reason are not counted here.
    #[serde(skip)]
    pub returns_by_reason: BTreeMap<String, u64>,
}

impl StyleAggregate {
    pub fn new(style_id: impl Into<String>) -> Self {
        Self {
            style_id: style_id.into(),
            total_units_sold: 0,
            gmv_cents: 0,
            first_sale_date: None,
            last_sale_date: None,
            total_returns: 0,
            rto_count: 0,
            customer_return_count: 0,
            unknown_return_count: 0,
            return_rate: 0.0,
            in_catalog: false,
            sales_by_day: BTreeMap::new(),
            returns_by_day: BTreeMap::new(),
            returns_by_reason: BTreeMap::new(),
        }
    }

    fn record_sale(&mut self, sale: &SaleEvent) {
        self.total_units_sold += 1;
        self.gmv_cents += sale.amount_cents.unwrap_or(0);
        self.first_sale_date = Some(match self.first_sale_date {
            Some(first) => first.min(sale.date),
            None => sale.date,
        });
        self.last_sale_date = Some(match self.last_sale_date {
            Some(last) => last.max(sale.date),
            None => sale.date,
        });
        *self.sales_by_day.entry(sale.date).or_insert(0) += 1;
    }

    fn record_return(&mut self, ret: &ReturnEvent) {
        self.total_returns += 1;
        match ret.return_type {
            ReturnType::Rto => self.rto_count += 1,
            ReturnType::CustomerReturn => self.customer_return_count += 1,
            ReturnType::Unknown => self.unknown_return_count += 1,
        }
        self.returns_by_day
            .entry(ret.date)
            .or_default()
            .record(ret.return_type);
        if !ret.reason.is_empty() {
            *self.returns_by_reason.entry(ret.reason.clone()).or_insert(0) += 1;
        }
    }

    /// Units sold on days inside `window`.
    pub fn units_in(&self, window: &DateWindow) -> u64 {
        self.sales_by_day
            .range(window.start..window.end)
            .map(|(_, units)| units)
            .sum()
    }

    /// Returns dated inside `window`, by type.
    pub fn returns_in(&self, window: &DateWindow) -> ReturnCounts {
        self.returns_by_day
            .range(window.start..window.end)
            .fold(ReturnCounts::default(), |acc, (_, counts)| acc.add(counts))
    }

    pub fn has_sales(&self) -> bool {
        self.total_units_sold > 0
    }
}

/// Fold all events into per-style aggregates keyed by normalized style id.
///
/// The key set is the union of styles seen in sales, returns and catalog.
/// Units are event counts; no quantity weighting.
pub fn aggregate(
    sales: &[SaleEvent],
    returns: &[ReturnEvent],
    catalog: &[CatalogEntry],
) -> BTreeMap<String, StyleAggregate> {
    let mut styles: BTreeMap<String, StyleAggregate> = BTreeMap::new();

    for sale in sales {
        entry(&mut styles, &sale.style_id).record_sale(sale);
    }
    for ret in returns {
        entry(&mut styles, &ret.style_id).record_return(ret);
    }
    for item in catalog {
        entry(&mut styles, &item.style_id).in_catalog = true;
    }

    for agg in styles.values_mut() {
        agg.return_rate = if agg.total_units_sold > 0 {
            agg.total_returns as f64 / agg.total_units_sold as f64
        } else {
            0.0
        };
    }

    log::debug!(
        "aggregated {} sales and {} returns into {} styles",
        sales.len(),
        returns.len(),
        styles.len()
    );
    styles
}

fn entry<'a>(
    styles: &'a mut BTreeMap<String, StyleAggregate>,
    style_id: &str,
) -> &'a mut StyleAggregate {
    styles
        .entry(style_id.to_string())
        .or_insert_with(|| StyleAggregate::new(style_id))
}
