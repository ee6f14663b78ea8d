//! Report building on top of `stylepulse-engine`.
//!
//! `Session` owns the current upload and parameters and runs a full pass;
//! `report_builder` turns the engine's per-style results into the four
//! reports through pluggable `Filter` and `Selector` components.

pub mod components;
pub mod config;
pub mod csv_loader;
pub mod filter;
pub mod kpis;
pub mod report_builder;
pub mod selector;
pub mod session;
pub mod types;
pub mod util;

pub use csv_loader::{load_raw_rows, load_raw_rows_file, LoadError};
pub use report_builder::{build_reports, ReportBuilder, ReportInputs};
pub use session::Session;
pub use types::{
    ForecastRow, KpiSummary, MasterRow, ReasonCount, ReportQuery, ReportSet, ReturnsAnalysis,
    ReturnsRow, ReturnsTotals, WatchlistRow,
};
