//! Outlier detection and clipping.

use crate::utils::stats;
use serde::{Deserialize, Serialize};

/// Method for outlier detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlierMethod {
    /// Tukey fences at `threshold` interquartile ranges beyond the quartiles.
    IQR,
    /// Absolute z-score above `threshold`.
    ZScore,
    /// Absolute modified z-score (median and MAD) above `threshold`.
    ModifiedZScore,
}

/// Result of outlier detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierResult {
    /// Indices of detected outliers.
    pub outlier_indices: Vec<usize>,
    /// Outlier scores for each point (higher = more anomalous).
    pub scores: Vec<f64>,
    /// Values outside `lower..=upper` are outliers.
    pub lower: f64,
    pub upper: f64,
    /// Method used.
    pub method: OutlierMethod,
}

impl OutlierResult {
    /// Get the number of outliers detected.
    pub fn outlier_count(&self) -> usize {
        self.outlier_indices.len()
    }

    /// Check if a specific index is an outlier.
    pub fn is_outlier(&self, index: usize) -> bool {
        self.outlier_indices.binary_search(&index).is_ok()
    }
}

/// Configuration for outlier detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Detection method.
    pub method: OutlierMethod,
    /// Threshold (interpretation depends on method).
    pub threshold: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self::z_score(3.0)
    }
}

impl OutlierConfig {
    /// Use IQR method with specified multiplier (conventionally 1.5).
    pub fn iqr(multiplier: f64) -> Self {
        Self {
            method: OutlierMethod::IQR,
            threshold: multiplier,
        }
    }

    /// Use Z-score method with specified threshold (conventionally 3.0).
    pub fn z_score(threshold: f64) -> Self {
        Self {
            method: OutlierMethod::ZScore,
            threshold,
        }
    }

    /// Use Modified Z-score method with specified threshold (conventionally 3.5).
    pub fn modified_z_score(threshold: f64) -> Self {
        Self {
            method: OutlierMethod::ModifiedZScore,
            threshold,
        }
    }
}

/// Scale of the modified z-score: the 0.75 quantile of the standard normal.
const MAD_SCALE: f64 = 0.6745;

/// Detect outliers in a series. Non-finite values are ignored when
/// estimating the fences and never flagged.
pub fn detect_outliers(series: &[f64], config: &OutlierConfig) -> OutlierResult {
    let finite: Vec<f64> = series.iter().copied().filter(|x| x.is_finite()).collect();
    let (center, spread, lower, upper) = fences(&finite, config);

    let scores: Vec<f64> = series
        .iter()
        .map(|&x| {
            if !x.is_finite() || spread <= 0.0 {
                0.0
            } else {
                match config.method {
                    OutlierMethod::IQR => {
                        if x < lower {
                            (lower - x) / spread
                        } else if x > upper {
                            (x - upper) / spread
                        } else {
                            0.0
                        }
                    }
                    _ => ((x - center) / spread).abs(),
                }
            }
        })
        .collect();

    let outlier_indices = series
        .iter()
        .enumerate()
        .filter(|(_, &x)| x.is_finite() && spread > 0.0 && (x < lower || x > upper))
        .map(|(i, _)| i)
        .collect();

    OutlierResult {
        outlier_indices,
        scores,
        lower,
        upper,
        method: config.method,
    }
}

/// `(center, spread, lower fence, upper fence)` for the method.
fn fences(finite: &[f64], config: &OutlierConfig) -> (f64, f64, f64, f64) {
    let k = config.threshold;
    if finite.len() < 2 {
        return (0.0, 0.0, f64::NEG_INFINITY, f64::INFINITY);
    }

    let (center, spread) = match config.method {
        OutlierMethod::IQR => {
            let q1 = stats::quantile(finite, 0.25);
            let q3 = stats::quantile(finite, 0.75);
            let iqr = q3 - q1;
            if iqr <= 0.0 {
                return (q1, 0.0, f64::NEG_INFINITY, f64::INFINITY);
            }
            return (stats::median(finite), iqr, q1 - k * iqr, q3 + k * iqr);
        }
        OutlierMethod::ZScore => (stats::mean(finite), stats::std_dev(finite)),
        OutlierMethod::ModifiedZScore => {
            let median = stats::median(finite);
            let deviations: Vec<f64> = finite.iter().map(|x| (x - median).abs()).collect();
            (median, stats::median(&deviations) / MAD_SCALE)
        }
    };

    if !(spread > 1e-10) {
        return (center, 0.0, f64::NEG_INFINITY, f64::INFINITY);
    }
    (center, spread, center - k * spread, center + k * spread)
}

/// Clip outliers to the detection fences.
///
/// Returns the clipped series and the number of values changed.
pub fn clip_outliers(series: &[f64], config: &OutlierConfig) -> (Vec<f64>, usize) {
    let result = detect_outliers(series, config);
    let mut clipped = series.to_vec();
    for &i in &result.outlier_indices {
        clipped[i] = clipped[i].clamp(result.lower, result.upper);
    }
    (clipped, result.outlier_count())
}
