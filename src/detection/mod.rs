//! Detection utilities for time series analysis.
//!
//! - Spectral estimation (periodogram via FFT)
//! - Seasonal period detection
//! - Outliers

pub mod fft;
mod outlier;
mod seasonality;

pub use fft::{fft_real, periodogram, Periodogram};
pub use outlier::{clip_outliers, detect_outliers, OutlierConfig, OutlierMethod, OutlierResult};
pub use seasonality::{detect_seasonal_periods, seasonal_strength, DetectedPeriod, SeasonalityConfig};
