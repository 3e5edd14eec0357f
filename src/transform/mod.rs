//! Data transformations for time series.
//!
//! # Example
//!
//! ```
//! use sarimax_forecast::transform::{scale, ScalingMethod};
//!
//! let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
//! let scaled = scale(&series, ScalingMethod::Normalize);
//! assert_eq!(scaled.data[4], 1.0);
//! assert_eq!(scaled.inverse(), series);
//! ```

pub mod scale;

pub use scale::{normalize, scale, standardize, ScaleParams, ScaleResult, ScalingMethod};
