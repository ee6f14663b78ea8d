pub mod aggregator;
pub mod classifier;
pub mod error;
pub mod events;
pub mod forecaster;
pub mod normalizer;
pub mod params;
pub mod thresholds;
pub mod window;

pub use aggregator::{aggregate, ReturnCounts, StyleAggregate};
pub use classifier::{
    classify, classify_all, ActivitySignals, ClassificationFlags, NewnessBucket, StyleStatus,
    WatchTag,
};
pub use error::{
    ComputationInconsistency, ConfigurationError, EngineError, IngestionFailure,
};
pub use events::{CatalogEntry, EventStore, IngestReport, ReturnEvent, ReturnType, SaleEvent};
pub use forecaster::{forecast, forecast_all, ForecastResult, InventoryPlan};
pub use normalizer::{
    AliasTable, CanonicalField, ColumnMapping, IngestWarning, Normalizer, RawRow, SourceKind,
};
pub use params::ParameterSet;
pub use window::DateWindow;
