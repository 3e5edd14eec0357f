//! Seasonal decomposition.

mod classical;

pub use classical::{seasonal_decompose, seasonal_decompose_with_period, Decomposition};
