//! # sarimax-forecast
//!
//! Seasonal ARIMA forecasting with exogenous regressors.
//!
//! Multiplicative SARIMA models with any number of seasonal components are
//! fit by Newton-Raphson on the conditional log-likelihood. On top of the
//! model sit residual diagnostics, rolling-origin validation, grid-search
//! model selection and a forecasting service that persists models through
//! a pluggable store.
//!
//! ```
//! use sarimax_forecast::prelude::*;
//!
//! let values: Vec<f64> = (0..96)
//!     .map(|t| 20.0 + 5.0 * ((t % 12) as f64 / 12.0 * std::f64::consts::TAU).sin() + 0.1 * t as f64)
//!     .collect();
//! let config = ModelConfig::new(ModelOrder::new(1, 1, 0))
//!     .with_seasonal(SeasonalOrder::new(0, 1, 1, 12).unwrap());
//! let mut model = SeasonalModel::new(config).unwrap();
//! model.fit_values(&values).unwrap();
//! let forecast = model.predict_with_intervals(12, 0.95).unwrap();
//! assert_eq!(forecast.horizon(), 12);
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod detection;
pub mod error;
pub mod models;
pub mod seasonality;
pub mod selection;
pub mod service;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Forecast, TimeSeries, TimeSeriesPoint};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::{Forecaster, ModelConfig, ModelOrder, SeasonalModel, SeasonalOrder};
    pub use crate::selection::{ModelSelection, SelectionOptions};
    pub use crate::service::{ForecastingService, InMemoryModelStore};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics};
    pub use crate::validation::ModelValidator;
}
