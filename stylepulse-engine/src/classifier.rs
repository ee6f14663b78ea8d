//! Threshold classification of style aggregates.
//!
//! Each aggregate gets a set of flags evaluated against one `ParameterSet`
//! and one as-of date:
//! - zero-sale: days since last sale ≥ `zero_sale_age_days` (never sold = zero-sale)
//! - new: days since first sale < `new_age_days`
//! - high-return: return rate ≥ `high_return_pct`, only for styles with sales
//!
//! Flagged styles with sales inside the 30-day performance window go on the
//! watchlist; flagged styles without recent activity are dormant. The same
//! window drives the momentum tag shown next to each watchlist row.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::aggregator::{ReturnCounts, StyleAggregate};
use crate::params::ParameterSet;
use crate::thresholds::{MOMENTUM_FALLING, MOMENTUM_RISING, NEWNESS_BUCKET_BOUNDS};
use crate::window::DateWindow;

/// Age band by days since first sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NewnessBucket {
    #[serde(rename = "0-7d")]
    UpTo7,
    #[serde(rename = "8-30d")]
    UpTo30,
    #[serde(rename = "31-60d")]
    UpTo60,
    #[serde(rename = "61-90d")]
    UpTo90,
    #[serde(rename = "91d+")]
    Over90,
    Unknown,
}

impl fmt::Display for NewnessBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewnessBucket::UpTo7 => write!(f, "0-7d"),
            NewnessBucket::UpTo30 => write!(f, "8-30d"),
            NewnessBucket::UpTo60 => write!(f, "31-60d"),
            NewnessBucket::UpTo90 => write!(f, "61-90d"),
            NewnessBucket::Over90 => write!(f, "91d+"),
            NewnessBucket::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Lifecycle status, first matching rule wins: no sales → CatalogOnly,
/// zero-sale → ZeroSale, new → New, otherwise Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StyleStatus {
    #[serde(rename = "Catalog-Only")]
    CatalogOnly,
    #[serde(rename = "Zero-Sale")]
    ZeroSale,
    New,
    Active,
}

impl fmt::Display for StyleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleStatus::CatalogOnly => write!(f, "Catalog-Only"),
            StyleStatus::ZeroSale => write!(f, "Zero-Sale"),
            StyleStatus::New => write!(f, "New"),
            StyleStatus::Active => write!(f, "Active"),
        }
    }
}

/// Short trend label for the watchlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchTag {
    New,
    Started,
    Rising,
    Falling,
    Flat,
}

impl fmt::Display for WatchTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchTag::New => write!(f, "NEW"),
            WatchTag::Started => write!(f, "STARTED"),
            WatchTag::Rising => write!(f, "RISING"),
            WatchTag::Falling => write!(f, "FALLING"),
            WatchTag::Flat => write!(f, "FLAT"),
        }
    }
}

/// Order and return counts for the current and previous 30-day windows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySignals {
    /// Units in `[as_of - 30, as_of]`.
    pub orders_recent: u64,
    /// Units in `[as_of - 60, as_of - 30)`.
    pub orders_prev: u64,
    /// Returns dated in `[as_of - 30, as_of]`.
    pub returns_recent: ReturnCounts,
    /// `returns_recent / orders_recent`, 0 without recent orders.
    pub return_rate_recent: f64,
    pub momentum: f64,
    pub tag: WatchTag,
    pub note: String,
}

/// Every flag computed for one style.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationFlags {
    pub style_id: String,
    pub is_zero_sale: bool,
    pub is_new: bool,
    pub is_high_return: bool,
    /// Days since the last sale; `None` when the style never sold.
    pub age_since_last_sale: Option<i64>,
    pub days_since_first_sale: Option<i64>,
    pub newness: NewnessBucket,
    pub status: StyleStatus,
    pub activity: ActivitySignals,
    pub on_watchlist: bool,
    pub is_dormant: bool,
}

impl ClassificationFlags {
    pub fn is_flagged(&self) -> bool {
        self.is_zero_sale || self.is_high_return
    }
}

/// Classify one aggregate.
pub fn classify(
    agg: &StyleAggregate,
    params: &ParameterSet,
    as_of: NaiveDate,
) -> ClassificationFlags {
    let age_since_last_sale = agg.last_sale_date.map(|d| (as_of - d).num_days());
    let days_since_first_sale = agg.first_sale_date.map(|d| (as_of - d).num_days());

    // A style that never sold is infinitely old.
    let is_zero_sale = match age_since_last_sale {
        Some(age) => age >= i64::from(params.zero_sale_age_days),
        None => true,
    };
    let is_new = days_since_first_sale
        .map(|days| days < i64::from(params.new_age_days))
        .unwrap_or(false);
    let is_high_return = agg.total_units_sold > 0 && agg.return_rate >= params.high_return_pct;

    let window = DateWindow::performance(as_of);
    let orders_recent = agg.units_in(&window);
    let orders_prev = agg.units_in(&DateWindow::previous_performance(as_of));
    let returns_recent = agg.returns_in(&window);
    let return_rate_recent = if orders_recent > 0 {
        returns_recent.total() as f64 / orders_recent as f64
    } else {
        0.0
    };
    let momentum = momentum(orders_recent, orders_prev);
    let tag = watch_tag(
        is_new,
        orders_recent,
        orders_prev,
        momentum,
        params.watch_min_orders,
    );

    let flagged = is_zero_sale || is_high_return;
    let on_watchlist = flagged && orders_recent > 0;

    let status = if !agg.has_sales() {
        StyleStatus::CatalogOnly
    } else if is_zero_sale {
        StyleStatus::ZeroSale
    } else if is_new {
        StyleStatus::New
    } else {
        StyleStatus::Active
    };

    ClassificationFlags {
        style_id: agg.style_id.clone(),
        is_zero_sale,
        is_new,
        is_high_return,
        age_since_last_sale,
        days_since_first_sale,
        newness: newness_bucket(days_since_first_sale),
        status,
        activity: ActivitySignals {
            orders_recent,
            orders_prev,
            returns_recent,
            return_rate_recent,
            momentum,
            tag,
            note: watch_note(tag, return_rate_recent, params),
        },
        on_watchlist,
        is_dormant: flagged && !on_watchlist,
    }
}

/// Classify every aggregate in parallel. Output order follows the keys, not
/// the scheduler.
pub fn classify_all(
    aggregates: &BTreeMap<String, StyleAggregate>,
    params: &ParameterSet,
    as_of: NaiveDate,
) -> BTreeMap<String, ClassificationFlags> {
    aggregates
        .par_iter()
        .map(|(id, agg)| (id.clone(), classify(agg, params, as_of)))
        .collect()
}

/// Relative change of recent over previous orders.
///
/// 1.0 when the previous window was empty and the recent one was not; 0.0
/// when both were empty.
pub fn momentum(orders_recent: u64, orders_prev: u64) -> f64 {
    if orders_prev > 0 {
        (orders_recent as f64 - orders_prev as f64) / orders_prev as f64
    } else if orders_recent > 0 {
        1.0
    } else {
        0.0
    }
}

/// First matching rule wins: NEW, STARTED, RISING, FALLING, FLAT.
pub fn watch_tag(
    is_new: bool,
    orders_recent: u64,
    orders_prev: u64,
    momentum: f64,
    min_orders: u32,
) -> WatchTag {
    if is_new {
        WatchTag::New
    } else if orders_recent >= u64::from(min_orders) && orders_prev == 0 {
        WatchTag::Started
    } else if momentum > MOMENTUM_RISING {
        WatchTag::Rising
    } else if momentum < MOMENTUM_FALLING {
        WatchTag::Falling
    } else {
        WatchTag::Flat
    }
}

/// Note shown next to the tag, first matching rule wins: new, started,
/// high returns in the window, rising or falling. Flat styles get none.
pub fn watch_note(tag: WatchTag, return_rate_recent: f64, params: &ParameterSet) -> String {
    match tag {
        WatchTag::New => format!("New (under {}d)", params.new_age_days),
        WatchTag::Started => "Started performing recently".to_string(),
        _ if return_rate_recent >= params.high_return_pct => {
            format!("High returns ({:.1}%)", return_rate_recent * 100.0)
        }
        WatchTag::Rising | WatchTag::Falling => tag.to_string(),
        WatchTag::Flat => String::new(),
    }
}

pub fn newness_bucket(days_since_first_sale: Option<i64>) -> NewnessBucket {
    let [b7, b30, b60, b90] = NEWNESS_BUCKET_BOUNDS;
    match days_since_first_sale {
        Some(d) if d < 0 => NewnessBucket::Unknown,
        Some(d) if d <= b7 => NewnessBucket::UpTo7,
        Some(d) if d <= b30 => NewnessBucket::UpTo30,
        Some(d) if d <= b60 => NewnessBucket::UpTo60,
        Some(d) if d <= b90 => NewnessBucket::UpTo90,
        Some(_) => NewnessBucket::Over90,
        None => NewnessBucket::Unknown,
    }
}
