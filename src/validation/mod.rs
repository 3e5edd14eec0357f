//! Statistical validation of models and data.
//!
//! Residual diagnostics, stationarity and seasonality tests, and the
//! [`ModelValidator`] that ties them to cross-validation.
//!
//! # Example
//!
//! ```
//! use sarimax_forecast::validation::{durbin_watson, ljung_box, adf_test};
//!
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let lb = ljung_box(&residuals, Some(5), 0);
//! assert!(lb.statistic.is_finite());
//!
//! let dw = durbin_watson(&residuals);
//! assert!(dw.statistic > 2.0);
//!
//! let series: Vec<f64> = (0..40).map(|t| (t as f64 * 1.3).sin()).collect();
//! let adf = adf_test(&series, None);
//! assert!(adf.p_value <= 1.0);
//! ```

pub mod seasonality;
pub mod stationarity;
mod validator;

pub use residual_tests::{
    box_pierce, breusch_pagan, durbin_watson, jarque_bera, ljung_box, white_test,
    AutocorrelationType, DurbinWatsonResult, LjungBoxResult, TestResult,
};
pub use seasonality::{seasonality_test, SeasonalityTest};
pub use stationarity::{
    adf_test, kpss_test, test_stationarity, CriticalValues, StationarityConclusion,
    StationarityReport, StationarityResult,
};
pub use validator::{ModelValidator, ResidualOutlier, ResidualReport};
