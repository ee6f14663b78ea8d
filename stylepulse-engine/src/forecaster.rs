//! Run-rate demand forecasting and event inventory planning.
//!
//! The run rate is the average daily units over the trailing lookback window
//! `[as_of - L, as_of)`. Projected demand for a horizon `h` rounds
//! `rate x h` half up, computed on integers so that 10 units over 30 days
//! for 15 days is exactly 5.
//!
//! The inventory plan sizes stock for a sale event of `forecast_horizon_days`:
//!
//! ```text
//! gross  = rate x h x traffic_multiplier x (1 + clamp(momentum, -0.3, 0.5))
//! net    = gross x (1 - forecast_return_rate)
//! safety = 1.28 x sqrt(gross)
//! total  = ceil(net + safety)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::aggregator::StyleAggregate;
use crate::classifier::momentum;
use crate::events::SaleEvent;
use crate::params::ParameterSet;
use crate::thresholds::{
    LOW_CONFIDENCE_ACTIVE_DAYS, MOMENTUM_ADJUST_MAX, MOMENTUM_ADJUST_MIN, SAFETY_STOCK_Z,
};
use crate::window::DateWindow;

/// Stock needed to cover the configured event horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryPlan {
    pub gross_forecast: f64,
    pub net_forecast: f64,
    pub safety_stock: f64,
    pub total_required: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub style_id: String,
    pub lookback_days: u32,
    pub horizon_days: u32,
    pub units_in_window: u64,
    pub daily_run_rate: f64,
    pub projected_demand: u64,
    /// Distinct selling days inside the lookback window.
    pub confidence_basis: u32,
    pub low_confidence: bool,
    pub momentum: f64,
    pub plan: InventoryPlan,
}

impl ForecastResult {
    /// Projected demand for an arbitrary horizon, same rounding as
    /// `projected_demand`.
    pub fn projected_for(&self, horizon_days: u32) -> u64 {
        project(self.units_in_window, self.lookback_days, horizon_days)
    }
}

/// `round_half_up(units / lookback x horizon)` without floating point.
fn project(units: u64, lookback_days: u32, horizon_days: u32) -> u64 {
    if lookback_days == 0 {
        return 0;
    }
    let l = u128::from(lookback_days);
    let numerator = 2 * u128::from(units) * u128::from(horizon_days) + l;
    u64::try_from(numerator / (2 * l)).unwrap_or(u64::MAX)
}

/// Forecast one style from its sale events.
pub fn forecast(
    style_id: &str,
    sales: &[&SaleEvent],
    params: &ParameterSet,
    as_of: NaiveDate,
) -> ForecastResult {
    let lookback = DateWindow::lookback(as_of, u64::from(params.forecast_lookback_days));
    let recent_window = DateWindow::performance(as_of);
    let prev_window = DateWindow::previous_performance(as_of);

    let mut units_in_window = 0u64;
    let mut active_days = BTreeSet::new();
    let mut orders_recent = 0u64;
    let mut orders_prev = 0u64;
    for sale in sales {
        let units = u64::from(sale.quantity);
        if lookback.contains(sale.date) {
            units_in_window += units;
            active_days.insert(sale.date);
        }
        if recent_window.contains(sale.date) {
            orders_recent += units;
        } else if prev_window.contains(sale.date) {
            orders_prev += units;
        }
    }

    let lookback_days = params.forecast_lookback_days;
    let horizon_days = params.forecast_horizon_days;
    let daily_run_rate = if lookback_days > 0 {
        units_in_window as f64 / f64::from(lookback_days)
    } else {
        0.0
    };
    let confidence_basis = active_days.len() as u32;
    let momentum = momentum(orders_recent, orders_prev);

    ForecastResult {
        style_id: style_id.to_string(),
        lookback_days,
        horizon_days,
        units_in_window,
        daily_run_rate,
        projected_demand: project(units_in_window, lookback_days, horizon_days),
        confidence_basis,
        low_confidence: confidence_basis < LOW_CONFIDENCE_ACTIVE_DAYS,
        momentum,
        plan: inventory_plan(daily_run_rate, momentum, params),
    }
}

/// Event inventory plan for a given run rate and momentum.
pub fn inventory_plan(daily_run_rate: f64, momentum: f64, params: &ParameterSet) -> InventoryPlan {
    let adjustment = if params.use_momentum_adjust {
        momentum.clamp(MOMENTUM_ADJUST_MIN, MOMENTUM_ADJUST_MAX)
    } else {
        0.0
    };
    let gross_forecast = daily_run_rate
        * f64::from(params.forecast_horizon_days)
        * params.traffic_multiplier
        * (1.0 + adjustment);
    let net_forecast = gross_forecast * (1.0 - params.forecast_return_rate);
    let safety_stock = SAFETY_STOCK_Z * gross_forecast.max(0.0).sqrt();
    let total_required = (net_forecast + safety_stock).max(0.0).ceil() as u64;

    InventoryPlan {
        gross_forecast,
        net_forecast,
        safety_stock,
        total_required,
    }
}

/// Forecast every aggregated style in parallel. Styles without sale events
/// get a zero forecast.
pub fn forecast_all(
    aggregates: &BTreeMap<String, StyleAggregate>,
    sales_by_style: &BTreeMap<&str, Vec<&SaleEvent>>,
    params: &ParameterSet,
    as_of: NaiveDate,
) -> BTreeMap<String, ForecastResult> {
    aggregates
        .par_iter()
        .map(|(id, _)| {
            let sales = sales_by_style
                .get(id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            (id.clone(), forecast(id, sales, params, as_of))
        })
        .collect()
}
