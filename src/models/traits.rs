//! Forecaster trait defining the common interface for models.

use crate::core::{Forecast, TimeSeries};
use crate::error::Result;
use std::collections::HashMap;

/// Common interface for forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the time series data.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Generate predictions for the specified horizon.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Generate predictions with confidence intervals.
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        // Default implementation just returns point predictions
        let _ = level;
        self.predict(horizon)
    }

    /// Forecast given future values of exogenous regressors.
    ///
    /// Models without regressors ignore `future`.
    fn forecast_with_exogenous(
        &self,
        horizon: usize,
        future: &HashMap<String, Vec<f64>>,
    ) -> Result<Forecast> {
        let _ = future;
        self.predict(horizon)
    }

    /// Get the fitted values (in-sample one-step predictions).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Get the residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Number of estimated parameters, used by adjusted R².
    fn num_parameters(&self) -> usize {
        0
    }

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}
