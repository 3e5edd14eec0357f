//! Forecasting models.

mod traits;

pub mod arima;

pub use arima::{ModelConfig, ModelOrder, SeasonalModel, SeasonalOrder};
pub use traits::Forecaster;
