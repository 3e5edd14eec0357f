//! Core data structures for time series forecasting.

mod forecast;
mod time_series;

pub use forecast::{Forecast, ForecastPoint, ForecastResult};
pub use time_series::{interpolate_series, TimeSeries, TimeSeriesPoint};
