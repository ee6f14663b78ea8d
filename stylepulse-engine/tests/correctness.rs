//! Correctness tests for stylepulse-engine.
//!
//! Validates that:
//! 1. Style ids normalize idempotently and differently-cased ids merge
//! 2. Units sold always equal the number of sale events
//! 3. Return rates stay non-negative and never-sold styles are never high-return
//! 4. Determinism: the same inputs produce byte-identical output
//! 5. Watchlist, forecast and returns-split scenarios give the legacy numbers
//! 6. A sales file without a style column yields no events at all

use chrono::NaiveDate;

use stylepulse_engine::classifier::classify_all;
use stylepulse_engine::events::{EventStore, ReturnType};
use stylepulse_engine::normalizer::{normalize_style_id, Normalizer, RawRow, SourceKind};
use stylepulse_engine::{aggregate, classify, forecast, IngestionFailure, ParameterSet};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ---------------------------------------------------------------------------
// Helper row generators
// ---------------------------------------------------------------------------

fn sale_row(date: &str, style: &str) -> RawRow {
    RawRow::new(SourceKind::Sales)
        .with("Created On", date)
        .with("Style ID", style)
        .with("Final Price", "799")
}

fn return_row(date: &str, style: &str, reason: &str) -> RawRow {
    RawRow::new(SourceKind::Returns)
        .with("Return Date", date)
        .with("Style ID", style)
        .with("Return Reason", reason)
}

fn ingest(sales: &[RawRow], returns: &[RawRow]) -> EventStore {
    let returns = if returns.is_empty() {
        None
    } else {
        Some(returns)
    };
    let (store, report) = EventStore::ingest(&Normalizer::default(), sales, returns, None);
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    store
}

// ---------------------------------------------------------------------------
// Style id invariants
// ---------------------------------------------------------------------------

#[test]
fn style_id_normalization_is_idempotent() {
    for raw in ["  ABC-1 ", "abc-1", "00123.0", "Style 9", "x"] {
        let once = normalize_style_id(raw).unwrap();
        assert_eq!(normalize_style_id(&once).unwrap(), once);
    }
}

#[test]
fn padded_and_cased_ids_aggregate_together() {
    let store = ingest(
        &[
            sale_row("2024-05-01", "  ABC-1 "),
            sale_row("2024-05-02", "abc-1"),
            sale_row("2024-05-03", "ABC-1"),
        ],
        &[],
    );
    let styles = aggregate(&store.sales, &store.returns, &store.catalog);
    assert_eq!(styles.len(), 1);
    assert_eq!(styles["abc-1"].total_units_sold, 3);
}

// ---------------------------------------------------------------------------
// Aggregation invariants
// ---------------------------------------------------------------------------

#[test]
fn units_sold_equal_sale_event_count() {
    let rows: Vec<RawRow> = (0..25)
        .map(|i| sale_row(&format!("2024-05-{:02}", i % 28 + 1), &format!("s-{}", i % 4)))
        .collect();
    let store = ingest(&rows, &[]);
    let styles = aggregate(&store.sales, &store.returns, &store.catalog);

    for (style_id, agg) in &styles {
        let events = store.sales.iter().filter(|s| &s.style_id == style_id).count();
        assert_eq!(agg.total_units_sold, events as u64, "style {}", style_id);
    }
    let total: u64 = styles.values().map(|a| a.total_units_sold).sum();
    assert_eq!(total, 25);
}

#[test]
fn return_rate_bounds_and_zero_sale_exclusion() {
    let store = ingest(
        &[sale_row("2024-05-01", "sold")],
        &[
            return_row("2024-05-05", "sold", "RTO"),
            return_row("2024-05-05", "never-sold", "Customer Return"),
            return_row("2024-05-06", "never-sold", "Customer Return"),
        ],
    );
    let styles = aggregate(&store.sales, &store.returns, &store.catalog);
    let params = ParameterSet::default();
    let as_of = ymd(2024, 6, 1);

    for agg in styles.values() {
        assert!(agg.return_rate >= 0.0);
        let flags = classify(agg, &params, as_of);
        if agg.total_units_sold == 0 {
            assert!(!flags.is_high_return);
        }
    }
    assert_eq!(styles["never-sold"].total_returns, 2);
    assert_eq!(styles["never-sold"].return_rate, 0.0);
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn recomputation_is_byte_identical() {
    let sales: Vec<RawRow> = (1..=20)
        .map(|d| sale_row(&format!("2024-05-{:02}", d), &format!("s-{}", d % 3)))
        .collect();
    let returns = vec![return_row("2024-05-10", "s-1", "Size issue")];
    let params = ParameterSet::default();
    let as_of = ymd(2024, 6, 1);

    let run = || {
        let store = ingest(&sales, &returns);
        let styles = aggregate(&store.sales, &store.returns, &store.catalog);
        let flags = classify_all(&styles, &params, as_of);
        serde_json::to_string(&(styles, flags)).unwrap()
    };
    assert_eq!(run(), run());
}

// ---------------------------------------------------------------------------
// Legacy scenarios
// ---------------------------------------------------------------------------

#[test]
fn watchlist_age_scenario() {
    let store = ingest(&[sale_row("2024-05-12", "w-1")], &[]);
    let styles = aggregate(&store.sales, &store.returns, &store.catalog);
    let as_of = ymd(2024, 6, 1); // 20 days after the last sale

    let strict = ParameterSet {
        zero_sale_age_days: 14,
        ..ParameterSet::default()
    };
    let flags = classify(&styles["w-1"], &strict, as_of);
    assert_eq!(flags.age_since_last_sale, Some(20));
    assert!(flags.is_zero_sale);
    assert!(flags.on_watchlist);

    let lenient = ParameterSet {
        zero_sale_age_days: 30,
        ..ParameterSet::default()
    };
    let flags = classify(&styles["w-1"], &lenient, as_of);
    assert!(!flags.is_zero_sale);
    assert!(!flags.on_watchlist);
}

#[test]
fn forecast_scenario() {
    let rows: Vec<RawRow> = (1..=10)
        .map(|d| sale_row(&format!("2024-05-{:02}", d * 3), "f-1"))
        .collect();
    let store = ingest(&rows, &[]);
    let by_style = store.sales_by_style();
    let params = ParameterSet {
        forecast_lookback_days: 30,
        forecast_horizon_days: 15,
        ..ParameterSet::default()
    };

    // sales on May 3..=30, all inside [2024-05-02, 2024-06-01)
    let result = forecast("f-1", &by_style["f-1"], &params, ymd(2024, 6, 1));
    assert_eq!(result.units_in_window, 10);
    assert!((result.daily_run_rate - 0.3333).abs() < 1e-3);
    assert_eq!(result.projected_demand, 5);
}

#[test]
fn returns_split_scenario() {
    let mut returns = Vec::new();
    for _ in 0..6 {
        returns.push(return_row("2024-05-20", "r-1", "RTO"));
    }
    for _ in 0..3 {
        returns.push(return_row("2024-05-21", "r-1", "Customer Return"));
    }
    returns.push(return_row("2024-05-22", "r-1", "lost in transit"));

    let store = ingest(&[sale_row("2024-05-01", "r-1")], &returns);
    let styles = aggregate(&store.sales, &store.returns, &store.catalog);
    let r = &styles["r-1"];
    assert_eq!(r.rto_count, 6);
    assert_eq!(r.customer_return_count, 3);
    assert_eq!(r.unknown_return_count, 1);
    assert_eq!(r.total_returns, 10);
    assert_eq!(
        store
            .returns
            .iter()
            .filter(|e| e.return_type == ReturnType::Unknown)
            .count(),
        1
    );
}

#[test]
fn missing_style_column_yields_no_events() {
    let rows = vec![RawRow::new(SourceKind::Sales)
        .with("Created On", "2024-05-01")
        .with("Brand", "Acme")
        .with("Final Price", "100")];

    let err = Normalizer::default()
        .normalize::<stylepulse_engine::SaleEvent>(&rows)
        .unwrap_err();
    assert!(matches!(err, IngestionFailure::UnmappedField { .. }));

    let (store, report) = EventStore::ingest(&Normalizer::default(), &rows, None, None);
    assert!(store.sales.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(aggregate(&store.sales, &store.returns, &store.catalog).is_empty());
}
