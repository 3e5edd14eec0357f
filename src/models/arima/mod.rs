//! Seasonal ARIMA models with optional exogenous regressors.
//!
//! - Orders and configuration: (p, d, q) with any number of seasonal
//!   (P, D, Q)\[m\] components
//! - Differencing and its inversion
//! - Conditional maximum likelihood fitting, forecasting and diagnostics

mod config;
pub mod diff;
mod model;

pub use config::{ModelConfig, ModelOrder, SeasonalOrder};
pub use diff::{difference, integrate, seasonal_difference};
pub use model::{FittedState, ModelDiagnostics, ParameterEstimate, SeasonalModel};
