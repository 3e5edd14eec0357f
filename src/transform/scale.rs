//! Scaling and normalization transforms for time series.

use crate::utils::stats;
use serde::{Deserialize, Serialize};

/// Scaling method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingMethod {
    /// Zero mean, unit variance.
    Standardize,
    /// Min-max to `[0, 1]`.
    Normalize,
}

/// Parameters of an affine scaling `(x - center) / scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    /// Center value used (mean or minimum)
    pub center: f64,
    /// Scale value used (std dev or range)
    pub scale: f64,
}

impl ScaleParams {
    /// Parameters that leave data unchanged.
    pub fn identity() -> Self {
        Self {
            center: 0.0,
            scale: 1.0,
        }
    }

    /// Transform new data using these parameters.
    pub fn transform(&self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|x| (x - self.center) / self.scale).collect()
    }

    /// Map scaled values back to the original units.
    pub fn inverse(&self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|x| x * self.scale + self.center).collect()
    }

    /// Map a scaled spread (such as a standard error) back to original units.
    pub fn inverse_spread(&self, spread: f64) -> f64 {
        spread * self.scale
    }
}

/// Result of a scaling transform, containing parameters for inverse transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleResult {
    /// Transformed data
    pub data: Vec<f64>,
    pub params: ScaleParams,
}

impl ScaleResult {
    /// Inverse transform to recover original scale.
    pub fn inverse(&self) -> Vec<f64> {
        self.params.inverse(&self.data)
    }
}

/// Scale `series` with `method`.
pub fn scale(series: &[f64], method: ScalingMethod) -> ScaleResult {
    match method {
        ScalingMethod::Standardize => standardize(series),
        ScalingMethod::Normalize => normalize(series),
    }
}

/// Standardize data to zero mean and unit variance (z-score normalization).
///
/// A constant series keeps scale 1.
pub fn standardize(series: &[f64]) -> ScaleResult {
    if series.is_empty() {
        return ScaleResult {
            data: Vec::new(),
            params: ScaleParams::identity(),
        };
    }

    let std = stats::std_dev(series);
    let params = ScaleParams {
        center: stats::mean(series),
        scale: if std.is_finite() && std >= 1e-10 { std } else { 1.0 },
    };

    ScaleResult {
        data: params.transform(series),
        params,
    }
}

/// Normalize data to [0, 1] range (min-max normalization).
pub fn normalize(series: &[f64]) -> ScaleResult {
    if series.is_empty() {
        return ScaleResult {
            data: Vec::new(),
            params: ScaleParams::identity(),
        };
    }

    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let params = ScaleParams {
        center: min,
        scale: if range < 1e-10 { 1.0 } else { range },
    };

    ScaleResult {
        data: params.transform(series),
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn standardize_basic() {
        let result = standardize(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_relative_eq!(result.params.center, 3.0, epsilon = 1e-10);
        assert_relative_eq!(result.params.scale, 2.5_f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(stats::mean(&result.data), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn standardize_constant() {
        let result = standardize(&[5.0; 10]);
        assert_relative_eq!(result.params.center, 5.0, epsilon = 1e-10);
        assert_relative_eq!(result.params.scale, 1.0, epsilon = 1e-10);
        assert!(standardize(&[]).data.is_empty());
        // A single value has no variance
        assert_eq!(standardize(&[2.0]).params.scale, 1.0);
    }

    #[test]
    fn inverse_recovers_original() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        for method in [ScalingMethod::Standardize, ScalingMethod::Normalize] {
            let result = scale(&series, method);
            for (orig, rec) in series.iter().zip(result.inverse()) {
                assert_relative_eq!(*orig, rec, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn normalize_basic() {
        let result = normalize(&[-10.0, 0.0, 10.0]);
        assert_relative_eq!(result.data[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(result.data[1], 0.5, epsilon = 1e-10);
        assert_relative_eq!(result.data[2], 1.0, epsilon = 1e-10);

        for x in normalize(&[5.0; 10]).data {
            assert_relative_eq!(x, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn params_apply_to_new_data() {
        let result = standardize(&[2.0, 4.0, 6.0]);
        let scaled = result.params.transform(&[4.0, 8.0]);
        assert_relative_eq!(scaled[0], 0.0);
        assert_relative_eq!(scaled[1], 2.0);
        assert_relative_eq!(result.params.inverse_spread(1.5), 3.0);
    }
}
