//! Report assembly.
//!
//! Pure derivations from the aggregates, flags and forecasts of one pass:
//! 1. Master table: one row per style, sorted by style id
//! 2. Watchlist: flagged styles through the watchlist filter chain, ordered by
//!    `WatchlistSelector`; everything the chain removes becomes the dormant list
//! 3. Returns analysis: styles with at least one return, plus totals
//! 4. Forecast report: forecasts through the forecast filter chain, ordered by
//!    `DemandSelector`
//!
//! The master table's `on_watchlist` / `is_dormant` columns record where each
//! style actually landed, so they agree with the lists under any filter chain.
//!
//! Missing or extra keys between the inputs are a `ComputationInconsistency`:
//! a report with silently missing styles is worse than no report.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use stylepulse_engine::{
    CatalogEntry, ClassificationFlags, ComputationInconsistency, ForecastResult, StyleAggregate,
};

use crate::components::activity_window_filter::ActivityWindowFilter;
use crate::components::demand_selector::DemandSelector;
use crate::components::sold_styles_filter::SoldStylesFilter;
use crate::components::watchlist_selector::WatchlistSelector;
use crate::filter::Filter;
use crate::selector::Selector;
use crate::types::{
    ForecastRow, KpiSummary, MasterRow, ReasonCount, ReportQuery, ReportSet, ReturnsAnalysis,
    ReturnsRow, ReturnsTotals, WatchlistRow,
};
use crate::util::ratio;

/// Everything a pass hands to the report builder.
pub struct ReportInputs<'a> {
    pub aggregates: &'a BTreeMap<String, StyleAggregate>,
    pub flags: &'a BTreeMap<String, ClassificationFlags>,
    pub forecasts: &'a BTreeMap<String, ForecastResult>,
    pub catalog: &'a BTreeMap<String, CatalogEntry>,
    pub kpis: KpiSummary,
}

/// Report builder with pluggable filter chains.
pub struct ReportBuilder {
    watchlist_filters: Vec<Box<dyn Filter<ReportQuery, WatchlistRow>>>,
    forecast_filters: Vec<Box<dyn Filter<ReportQuery, ForecastRow>>>,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(
            vec![Box::new(ActivityWindowFilter)],
            vec![Box::new(SoldStylesFilter)],
        )
    }
}

impl ReportBuilder {
    pub fn new(
        watchlist_filters: Vec<Box<dyn Filter<ReportQuery, WatchlistRow>>>,
        forecast_filters: Vec<Box<dyn Filter<ReportQuery, ForecastRow>>>,
    ) -> Self {
        Self {
            watchlist_filters,
            forecast_filters,
        }
    }

    pub fn build(
        &self,
        inputs: ReportInputs<'_>,
        query: &ReportQuery,
    ) -> Result<ReportSet, ComputationInconsistency> {
        check_consistency(&inputs)?;

        // --- Watchlist / dormant ---
        let mut flagged = Vec::new();
        for (id, agg) in inputs.aggregates {
            let flags = lookup(inputs.flags, id, "classification")?;
            if flags.is_flagged() {
                flagged.push(WatchlistRow::from_parts(agg, flags));
            }
        }
        let (active, dormant) = run_filters(&self.watchlist_filters, query, flagged)?;
        let placement = Placement {
            watchlist: active.iter().map(|r| r.style_id.clone()).collect(),
            dormant: dormant.iter().map(|r| r.style_id.clone()).collect(),
        };
        let watchlist = run_selector(&WatchlistSelector::new(query.top), query, active);
        let dormant = run_selector(&WatchlistSelector::default(), query, dormant);

        let master = master_table(&inputs, &placement)?;

        // --- Returns ---
        let returns = returns_analysis(inputs.aggregates);

        // --- Forecast ---
        let mut forecast_rows = Vec::with_capacity(inputs.aggregates.len());
        for (id, agg) in inputs.aggregates {
            let forecast = lookup(inputs.forecasts, id, "forecast")?;
            forecast_rows.push(ForecastRow::from_parts(agg, forecast));
        }
        let (forecast_rows, _) = run_filters(&self.forecast_filters, query, forecast_rows)?;
        let forecast = run_selector(&DemandSelector::new(query.top), query, forecast_rows);

        log::info!(
            "reports: {} styles, {} on watchlist, {} dormant, {} with returns, {} forecast rows",
            master.len(),
            watchlist.len(),
            dormant.len(),
            returns.rows.len(),
            forecast.len()
        );

        Ok(ReportSet {
            as_of: query.as_of,
            master,
            watchlist,
            dormant,
            returns,
            forecast,
            kpis: inputs.kpis,
        })
    }
}

/// Build all reports with the default filter chains.
pub fn build_reports(
    inputs: ReportInputs<'_>,
    query: &ReportQuery,
) -> Result<ReportSet, ComputationInconsistency> {
    ReportBuilder::default().build(inputs, query)
}

fn lookup<'a, T>(
    map: &'a BTreeMap<String, T>,
    style_id: &str,
    what: &str,
) -> Result<&'a T, ComputationInconsistency> {
    map.get(style_id).ok_or_else(|| {
        ComputationInconsistency(format!("style {} has no {}", style_id, what))
    })
}

fn check_consistency(inputs: &ReportInputs<'_>) -> Result<(), ComputationInconsistency> {
    for (what, keys) in [
        ("classification", inputs.flags.keys().collect::<Vec<_>>()),
        ("forecast", inputs.forecasts.keys().collect::<Vec<_>>()),
    ] {
        if let Some(extra) = keys.iter().find(|k| !inputs.aggregates.contains_key(k.as_str())) {
            return Err(ComputationInconsistency(format!(
                "{} for unknown style {}",
                what, extra
            )));
        }
    }
    for agg in inputs.aggregates.values() {
        let by_day: u64 = agg.sales_by_day.values().sum();
        if by_day != agg.total_units_sold {
            return Err(ComputationInconsistency(format!(
                "style {}: {} units sold but {} in the daily breakdown",
                agg.style_id, agg.total_units_sold, by_day
            )));
        }
    }
    Ok(())
}

/// Which list each flagged style ended up on, before `--top` truncation.
struct Placement {
    watchlist: BTreeSet<String>,
    dormant: BTreeSet<String>,
}

fn master_table(
    inputs: &ReportInputs<'_>,
    placement: &Placement,
) -> Result<Vec<MasterRow>, ComputationInconsistency> {
    inputs
        .aggregates
        .par_iter()
        .map(|(id, agg)| {
            let flags = lookup(inputs.flags, id, "classification")?;
            let forecast = lookup(inputs.forecasts, id, "forecast")?;
            let attributes = inputs
                .catalog
                .get(id)
                .map(|entry| entry.attributes.clone())
                .unwrap_or_default();
            Ok(MasterRow {
                style_id: id.clone(),
                status: flags.status,
                newness: flags.newness,
                first_sale_date: agg.first_sale_date,
                last_sale_date: agg.last_sale_date,
                days_since_first_sale: flags.days_since_first_sale,
                age_since_last_sale: flags.age_since_last_sale,
                total_units_sold: agg.total_units_sold,
                gmv_cents: agg.gmv_cents,
                total_returns: agg.total_returns,
                rto_count: agg.rto_count,
                customer_return_count: agg.customer_return_count,
                unknown_return_count: agg.unknown_return_count,
                return_rate: agg.return_rate,
                is_zero_sale: flags.is_zero_sale,
                is_new: flags.is_new,
                is_high_return: flags.is_high_return,
                on_watchlist: placement.watchlist.contains(id),
                is_dormant: placement.dormant.contains(id),
                orders_recent: flags.activity.orders_recent,
                orders_prev: flags.activity.orders_prev,
                momentum: flags.activity.momentum,
                tag: flags.activity.tag,
                daily_run_rate: forecast.daily_run_rate,
                projected_demand: forecast.projected_demand,
                in_catalog: agg.in_catalog,
                attributes,
            })
        })
        .collect()
}

fn run_filters<C>(
    filters: &[Box<dyn Filter<ReportQuery, C>>],
    query: &ReportQuery,
    candidates: Vec<C>,
) -> Result<(Vec<C>, Vec<C>), ComputationInconsistency> {
    let mut kept = candidates;
    let mut removed = Vec::new();
    for filter in filters {
        if !filter.enable(query) {
            continue;
        }
        let result = filter.filter(query, kept).map_err(|e| {
            ComputationInconsistency(format!("filter {} failed: {}", filter.name(), e))
        })?;
        log::debug!(
            "{}: kept {}, removed {}",
            filter.name(),
            result.kept.len(),
            result.removed.len()
        );
        kept = result.kept;
        removed.extend(result.removed);
    }
    Ok((kept, removed))
}

fn run_selector<C>(
    selector: &impl Selector<ReportQuery, C>,
    query: &ReportQuery,
    candidates: Vec<C>,
) -> Vec<C> {
    let total = candidates.len();
    let selected = selector.select(query, candidates);
    log::debug!("{}: selected {} of {}", selector.name(), selected.len(), total);
    selected
}

fn returns_analysis(aggregates: &BTreeMap<String, StyleAggregate>) -> ReturnsAnalysis {
    let mut totals = ReturnsTotals::default();
    let mut rows = Vec::new();
    let mut by_reason: BTreeMap<&str, u64> = BTreeMap::new();
    for agg in aggregates.values() {
        totals.total_units_sold += agg.total_units_sold;
        if agg.total_returns == 0 {
            continue;
        }
        for (reason, count) in &agg.returns_by_reason {
            *by_reason.entry(reason.as_str()).or_insert(0) += count;
        }
        totals.total_returns += agg.total_returns;
        totals.rto_count += agg.rto_count;
        totals.customer_return_count += agg.customer_return_count;
        totals.unknown_return_count += agg.unknown_return_count;
        rows.push(ReturnsRow {
            style_id: agg.style_id.clone(),
            total_returns: agg.total_returns,
            rto_count: agg.rto_count,
            customer_return_count: agg.customer_return_count,
            unknown_return_count: agg.unknown_return_count,
            rto_share: ratio(agg.rto_count, agg.total_returns),
            return_rate: agg.return_rate,
        });
    }
    totals.overall_return_rate = ratio(totals.total_returns, totals.total_units_sold);

    let mut reasons: Vec<ReasonCount> = by_reason
        .into_iter()
        .map(|(reason, count)| ReasonCount {
            reason: reason.to_string(),
            count,
        })
        .collect();
    // stable: equal counts keep the reason order of by_reason
    reasons.sort_by(|a, b| b.count.cmp(&a.count));

    ReturnsAnalysis {
        rows,
        totals,
        reasons,
    }
}
