use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use stylepulse_engine::classifier::{NewnessBucket, StyleStatus, WatchTag};
use stylepulse_engine::{ClassificationFlags, ForecastResult, ParameterSet, StyleAggregate};

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Inputs shared by every report stage of one pass.
#[derive(Clone, Debug)]
pub struct ReportQuery {
    pub as_of: NaiveDate,
    pub params: ParameterSet,
    /// Truncate the watchlist and forecast report to this many rows.
    pub top: Option<usize>,
}

impl ReportQuery {
    pub fn new(as_of: NaiveDate, params: ParameterSet) -> Self {
        Self {
            as_of,
            params,
            top: None,
        }
    }

    pub fn with_top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }
}

// ---------------------------------------------------------------------------
// Master table
// ---------------------------------------------------------------------------

/// Everything known about one style.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MasterRow {
    pub style_id: String,
    pub status: StyleStatus,
    pub newness: NewnessBucket,
    pub first_sale_date: Option<NaiveDate>,
    pub last_sale_date: Option<NaiveDate>,
    pub days_since_first_sale: Option<i64>,
    pub age_since_last_sale: Option<i64>,
    pub total_units_sold: u64,
    pub gmv_cents: i64,
    pub total_returns: u64,
    pub rto_count: u64,
    pub customer_return_count: u64,
    pub unknown_return_count: u64,
    pub return_rate: f64,
    pub is_zero_sale: bool,
    pub is_new: bool,
    pub is_high_return: bool,
    pub on_watchlist: bool,
    pub is_dormant: bool,
    pub orders_recent: u64,
    pub orders_prev: u64,
    pub momentum: f64,
    pub tag: WatchTag,
    pub daily_run_rate: f64,
    pub projected_demand: u64,
    pub in_catalog: bool,
    pub attributes: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Watchlist
// ---------------------------------------------------------------------------

/// A style flagged for stagnation or elevated returns.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WatchlistRow {
    pub style_id: String,
    pub is_zero_sale: bool,
    pub is_high_return: bool,
    /// `None` when the style never sold; sorts ahead of every finite age.
    pub age_since_last_sale: Option<i64>,
    pub last_sale_date: Option<NaiveDate>,
    pub total_units_sold: u64,
    pub total_returns: u64,
    pub return_rate: f64,
    pub orders_recent: u64,
    pub orders_prev: u64,
    /// Returns inside the 30-day window.
    pub returns_recent: u64,
    pub rto_recent: u64,
    pub non_rto_recent: u64,
    /// Window returns over window orders.
    pub return_rate_recent: f64,
    pub momentum: f64,
    pub tag: WatchTag,
    pub note: String,
    /// Classifier verdict: flagged and sold inside the window.
    #[serde(skip)]
    pub on_watchlist: bool,
}

impl WatchlistRow {
    pub fn from_parts(agg: &StyleAggregate, flags: &ClassificationFlags) -> Self {
        let activity = &flags.activity;
        Self {
            style_id: agg.style_id.clone(),
            is_zero_sale: flags.is_zero_sale,
            is_high_return: flags.is_high_return,
            age_since_last_sale: flags.age_since_last_sale,
            last_sale_date: agg.last_sale_date,
            total_units_sold: agg.total_units_sold,
            total_returns: agg.total_returns,
            return_rate: agg.return_rate,
            orders_recent: activity.orders_recent,
            orders_prev: activity.orders_prev,
            returns_recent: activity.returns_recent.total(),
            rto_recent: activity.returns_recent.rto,
            non_rto_recent: activity.returns_recent.non_rto(),
            return_rate_recent: activity.return_rate_recent,
            momentum: activity.momentum,
            tag: activity.tag,
            note: activity.note.clone(),
            on_watchlist: flags.on_watchlist,
        }
    }

    /// Short human label for why the style is listed.
    pub fn reason(&self) -> &'static str {
        match (self.is_zero_sale, self.is_high_return) {
            (true, true) => "zero-sale, high-return",
            (true, false) => "zero-sale",
            (false, true) => "high-return",
            (false, false) => "",
        }
    }
}

// ---------------------------------------------------------------------------
// Returns analysis
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReturnsRow {
    pub style_id: String,
    pub total_returns: u64,
    pub rto_count: u64,
    pub customer_return_count: u64,
    pub unknown_return_count: u64,
    /// RTO returns as a fraction of all returns for the style.
    pub rto_share: f64,
    pub return_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReturnsTotals {
    pub total_returns: u64,
    pub rto_count: u64,
    pub customer_return_count: u64,
    pub unknown_return_count: u64,
    pub total_units_sold: u64,
    pub overall_return_rate: f64,
}

/// How often one reason text appears across all returns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReturnsAnalysis {
    pub rows: Vec<ReturnsRow>,
    pub totals: ReturnsTotals,
    /// Most frequent first, ties by reason text.
    pub reasons: Vec<ReasonCount>,
}

// ---------------------------------------------------------------------------
// Forecast report
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastRow {
    pub style_id: String,
    pub total_units_sold: u64,
    pub units_in_window: u64,
    pub daily_run_rate: f64,
    pub horizon_days: u32,
    pub projected_demand: u64,
    pub confidence_basis: u32,
    pub low_confidence: bool,
    pub momentum: f64,
    pub gross_forecast: f64,
    pub net_forecast: f64,
    pub safety_stock: f64,
    pub total_required: u64,
}

impl ForecastRow {
    pub fn from_parts(agg: &StyleAggregate, forecast: &ForecastResult) -> Self {
        Self {
            style_id: agg.style_id.clone(),
            total_units_sold: agg.total_units_sold,
            units_in_window: forecast.units_in_window,
            daily_run_rate: forecast.daily_run_rate,
            horizon_days: forecast.horizon_days,
            projected_demand: forecast.projected_demand,
            confidence_basis: forecast.confidence_basis,
            low_confidence: forecast.low_confidence,
            momentum: forecast.momentum,
            gross_forecast: forecast.plan.gross_forecast,
            net_forecast: forecast.plan.net_forecast,
            safety_stock: forecast.plan.safety_stock,
            total_required: forecast.plan.total_required,
        }
    }
}

// ---------------------------------------------------------------------------
// KPIs and the full report set
// ---------------------------------------------------------------------------

/// Headline numbers over the 30-day performance window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KpiSummary {
    pub window_start: NaiveDate,
    /// Last day inside the window (the as-of date).
    pub window_end: NaiveDate,
    pub orders: u64,
    pub gmv_cents: i64,
    pub returns: u64,
    /// Returns over orders in the window; 0 without orders.
    pub return_rate: f64,
    pub active_styles: usize,
    pub styles_tracked: usize,
}

/// All reports of one computation pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportSet {
    pub as_of: NaiveDate,
    pub master: Vec<MasterRow>,
    pub watchlist: Vec<WatchlistRow>,
    pub dormant: Vec<WatchlistRow>,
    pub returns: ReturnsAnalysis,
    pub forecast: Vec<ForecastRow>,
    pub kpis: KpiSummary,
}
