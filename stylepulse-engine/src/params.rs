//! Externally supplied computation parameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Parameters for one computation pass.
///
/// Defaults are the legacy tool's seeded values. Deserialization fills any
/// missing field from the defaults, so partial JSON settings files are valid.
/// `high_return_pct` and `forecast_return_rate` are fractions (0.35 = 35%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Days without a sale before a style counts as zero-sale.
    pub zero_sale_age_days: u32,
    /// Return rate at or above which a style is flagged high-return.
    pub high_return_pct: f64,
    /// Styles whose first sale is younger than this are "new".
    pub new_age_days: u32,
    /// Trailing window (days, excluding the as-of date) for the run rate.
    pub forecast_lookback_days: u32,
    /// Future horizon (days) for projected demand and the event plan.
    pub forecast_horizon_days: u32,
    /// Minimum recent orders for a STARTED watch tag.
    pub watch_min_orders: u32,
    /// Event traffic multiplier applied to the gross event forecast.
    pub traffic_multiplier: f64,
    /// Expected return rate netted out of the event forecast.
    pub forecast_return_rate: f64,
    /// Scale the event forecast by clamped 30-day momentum.
    pub use_momentum_adjust: bool,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            zero_sale_age_days: 14,
            high_return_pct: 0.35,
            new_age_days: 60,
            forecast_lookback_days: 30,
            forecast_horizon_days: 10,
            watch_min_orders: 3,
            traffic_multiplier: 3.0,
            forecast_return_rate: 0.25,
            use_momentum_adjust: true,
        }
    }
}

impl ParameterSet {
    /// Reject out-of-range values before any computation starts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        positive_days("zero_sale_age_days", self.zero_sale_age_days)?;
        positive_days("new_age_days", self.new_age_days)?;
        positive_days("forecast_lookback_days", self.forecast_lookback_days)?;
        positive_days("forecast_horizon_days", self.forecast_horizon_days)?;

        if !(self.high_return_pct > 0.0 && self.high_return_pct <= 1.0) {
            return Err(invalid(
                "high_return_pct",
                format!(
                    "expected a fraction in (0, 1], got {} (use 0.35 for 35%)",
                    self.high_return_pct
                ),
            ));
        }
        if !(self.forecast_return_rate >= 0.0 && self.forecast_return_rate < 1.0) {
            return Err(invalid(
                "forecast_return_rate",
                format!("expected a fraction in [0, 1), got {}", self.forecast_return_rate),
            ));
        }
        if !(self.traffic_multiplier.is_finite() && self.traffic_multiplier > 0.0) {
            return Err(invalid(
                "traffic_multiplier",
                format!("expected a positive number, got {}", self.traffic_multiplier),
            ));
        }
        Ok(())
    }
}

fn positive_days(name: &'static str, value: u32) -> Result<(), ConfigurationError> {
    if value == 0 {
        return Err(invalid(name, "must be at least 1 day".to_string()));
    }
    Ok(())
}

fn invalid(name: &'static str, reason: String) -> ConfigurationError {
    ConfigurationError::InvalidParameter { name, reason }
}
