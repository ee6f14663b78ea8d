//! Centralized fixed thresholds for style classification and forecasting.
//!
//! These values reproduce the legacy spreadsheet's hard-coded constants.
//! User-tunable values live in `ParameterSet`; everything here is fixed so
//! that two installations with the same parameters produce the same numbers.

/// Minimum score a header must reach before it is mapped to a canonical field.
/// Exact alias matches score 1.0, whole-token containment scores at least 0.8,
/// and anything else falls back to normalized edit-distance similarity.
pub const MIN_COLUMN_CONFIDENCE: f64 = 0.75;

/// Trailing window (inclusive of the as-of date) used for "30-day performance
/// tracking": watchlist activity, recent orders and dashboard KPIs.
pub const PERFORMANCE_WINDOW_DAYS: u64 = 30;

/// Momentum above this fraction tags a style as RISING.
pub const MOMENTUM_RISING: f64 = 0.15;

/// Momentum below this fraction tags a style as FALLING.
pub const MOMENTUM_FALLING: f64 = -0.15;

/// Lower clamp for the momentum adjustment applied to event forecasts.
pub const MOMENTUM_ADJUST_MIN: f64 = -0.3;

/// Upper clamp for the momentum adjustment applied to event forecasts.
pub const MOMENTUM_ADJUST_MAX: f64 = 0.5;

/// z-score for the ~90% service level used by the safety-stock formula.
pub const SAFETY_STOCK_Z: f64 = 1.28;

/// Forecasts backed by fewer distinct selling days than this are flagged
/// low-confidence. Advisory only: the projection itself is never altered.
pub const LOW_CONFIDENCE_ACTIVE_DAYS: u32 = 3;

/// Upper bounds (inclusive, in days since first sale) of the newness buckets.
pub const NEWNESS_BUCKET_BOUNDS: [i64; 4] = [7, 30, 60, 90];

/// Largest spreadsheet serial date accepted (9999-12-31).
pub const MAX_SPREADSHEET_SERIAL: f64 = 2_958_465.0;
