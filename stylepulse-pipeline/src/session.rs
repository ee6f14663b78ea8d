//! One user's working state: the current event store and parameters.
//!
//! A session holds no derived data. Every `compute` call runs the full pass
//! from the store, so replacing the store or the parameters can never leave
//! stale results behind.

use std::time::Instant;

use chrono::NaiveDate;

use stylepulse_engine::{
    aggregate, classify_all, forecast_all, ConfigurationError, EngineError, EventStore,
    IngestReport, Normalizer, ParameterSet, RawRow, SourceKind,
};

use crate::kpis::summarize;
use crate::report_builder::{ReportBuilder, ReportInputs};
use crate::types::{ReportQuery, ReportSet};

pub struct Session {
    store: EventStore,
    params: ParameterSet,
    normalizer: Normalizer,
    builder: ReportBuilder,
}

impl Session {
    /// Start an empty session. Parameters are validated up front.
    pub fn new(params: ParameterSet) -> Result<Self, ConfigurationError> {
        params.validate()?;
        Ok(Self {
            store: EventStore::default(),
            params,
            normalizer: Normalizer::default(),
            builder: ReportBuilder::default(),
        })
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_builder(mut self, builder: ReportBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Normalize a fresh upload and make it the current store.
    ///
    /// A file listed in `IngestReport::failures` does not replace anything:
    /// its events from the previous store are carried over. Files that were
    /// not supplied at all are cleared.
    pub fn ingest(
        &mut self,
        sales: &[RawRow],
        returns: Option<&[RawRow]>,
        catalog: Option<&[RawRow]>,
    ) -> IngestReport {
        let (mut store, report) = EventStore::ingest(&self.normalizer, sales, returns, catalog);
        if report.failed(SourceKind::Sales) {
            store.sales = std::mem::take(&mut self.store.sales);
        }
        if report.failed(SourceKind::Returns) {
            store.returns = std::mem::take(&mut self.store.returns);
        }
        if report.failed(SourceKind::Catalog) {
            store.catalog = std::mem::take(&mut self.store.catalog);
        }
        if !report.failures.is_empty() {
            log::warn!(
                "kept previous events for {} failed file(s)",
                report.failures.len()
            );
        }
        self.replace_store(store);
        report
    }

    pub fn replace_store(&mut self, store: EventStore) {
        self.store = store;
    }

    /// Swap parameters. On error the current parameters stay in place.
    pub fn update_params(&mut self, params: ParameterSet) -> Result<(), ConfigurationError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Run one full pass as of `as_of`: aggregate, classify and forecast in
    /// parallel, then build every report.
    pub fn compute(&self, as_of: NaiveDate, top: Option<usize>) -> Result<ReportSet, EngineError> {
        self.params.validate()?;
        let start = Instant::now();

        let store = &self.store;
        let params = &self.params;
        let aggregates = aggregate(&store.sales, &store.returns, &store.catalog);
        let sales_by_style = store.sales_by_style();
        let aggregate_ms = start.elapsed().as_millis();

        let (flags, forecasts) = rayon::join(
            || classify_all(&aggregates, params, as_of),
            || forecast_all(&aggregates, &sales_by_style, params, as_of),
        );
        let classify_ms = start.elapsed().as_millis() - aggregate_ms;

        let catalog = store.catalog_by_style();
        let kpis = summarize(store, &flags, as_of);
        let mut query = ReportQuery::new(as_of, params.clone());
        query.top = top;

        let reports = self.builder.build(
            ReportInputs {
                aggregates: &aggregates,
                flags: &flags,
                forecasts: &forecasts,
                catalog: &catalog,
                kpis,
            },
            &query,
        )?;

        log::info!(
            "pass as of {}: {} styles in {}ms (aggregate {}ms, classify+forecast {}ms)",
            as_of,
            aggregates.len(),
            start.elapsed().as_millis(),
            aggregate_ms,
            classify_ms
        );
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_sales(rows: &[(&str, &str)]) -> Vec<RawRow> {
        rows.iter()
            .map(|(date, style)| {
                RawRow::new(SourceKind::Sales)
                    .with("Order Date", *date)
                    .with("SKU", *style)
            })
            .collect()
    }

    #[test]
    fn invalid_params_are_rejected_on_creation() {
        let params = ParameterSet {
            zero_sale_age_days: 0,
            ..ParameterSet::default()
        };
        assert!(Session::new(params).is_err());
    }

    #[test]
    fn failed_update_keeps_previous_params() {
        let mut session = Session::new(ParameterSet::default()).unwrap();
        let good = ParameterSet {
            zero_sale_age_days: 21,
            ..ParameterSet::default()
        };
        session.update_params(good.clone()).unwrap();

        let bad = ParameterSet {
            high_return_pct: 35.0,
            ..ParameterSet::default()
        };
        assert!(session.update_params(bad).is_err());
        assert_eq!(session.params(), &good);
    }

    #[test]
    fn ingest_replaces_the_store() {
        let mut session = Session::new(ParameterSet::default()).unwrap();
        session.ingest(
            &make_sales(&[("2024-06-01", "a"), ("2024-06-02", "b")]),
            None,
            None,
        );
        assert_eq!(session.store().sales.len(), 2);

        let report = session.ingest(&make_sales(&[("2024-06-03", "c")]), None, None);
        assert!(report.failures.is_empty());
        assert_eq!(session.store().sales.len(), 1);
        assert_eq!(session.store().sales[0].style_id, "c");
    }

    #[test]
    fn failed_sales_upload_keeps_previous_sales() {
        let mut session = Session::new(ParameterSet::default()).unwrap();
        session.ingest(
            &make_sales(&[("2024-06-20", "a"), ("2024-06-21", "b")]),
            None,
            None,
        );

        // no style column anywhere
        let broken = vec![RawRow::new(SourceKind::Sales)
            .with("Order Date", "2024-06-25")
            .with("Colour", "Red")];
        let catalog = vec![RawRow::new(SourceKind::Catalog)
            .with("Style ID", "c")
            .with("Brand", "Acme")];
        let report = session.ingest(&broken, None, Some(catalog.as_slice()));

        assert!(report.failed(SourceKind::Sales));
        assert_eq!(session.store().sales.len(), 2);
        assert_eq!(session.store().catalog.len(), 1);

        let reports = session.compute(ymd(2024, 6, 30), None).unwrap();
        let ids: Vec<&str> = reports.master.iter().map(|r| r.style_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(reports.master[0].total_units_sold, 1);
    }

    #[test]
    fn failed_returns_upload_keeps_previous_returns() {
        let mut session = Session::new(ParameterSet::default()).unwrap();
        let returns = vec![RawRow::new(SourceKind::Returns)
            .with("Return Date", "2024-06-22")
            .with("SKU", "a")
            .with("Return Reason", "RTO")];
        session.ingest(
            &make_sales(&[("2024-06-20", "a")]),
            Some(returns.as_slice()),
            None,
        );
        assert_eq!(session.store().returns.len(), 1);

        let report = session.ingest(&make_sales(&[("2024-06-21", "a")]), Some(&[][..]), None);
        assert!(report.failed(SourceKind::Returns));
        assert_eq!(session.store().returns.len(), 1);
        assert_eq!(session.store().sales[0].date, ymd(2024, 6, 21));
    }

    #[test]
    fn compute_on_empty_store_is_empty() {
        let session = Session::new(ParameterSet::default()).unwrap();
        let reports = session.compute(ymd(2024, 6, 30), None).unwrap();
        assert!(reports.master.is_empty());
        assert!(reports.watchlist.is_empty());
        assert!(reports.forecast.is_empty());
        assert_eq!(reports.kpis.orders, 0);
    }

    #[test]
    fn params_change_the_next_pass() {
        let mut session = Session::new(ParameterSet::default()).unwrap();
        session.ingest(&make_sales(&[("2024-06-10", "a")]), None, None);
        let as_of = ymd(2024, 6, 30);

        let reports = session.compute(as_of, None).unwrap();
        assert_eq!(reports.watchlist.len(), 1);

        session
            .update_params(ParameterSet {
                zero_sale_age_days: 30,
                ..ParameterSet::default()
            })
            .unwrap();
        let reports = session.compute(as_of, None).unwrap();
        assert!(reports.watchlist.is_empty());
    }
}
