//! Classical additive decomposition.
//!
//! Trend is a centered moving average with window `min(12, n/4)`; the
//! seasonal component is the phase average of the detrended series.

use crate::detection::{detect_seasonal_periods, seasonal_strength, SeasonalityConfig};
use crate::error::{ForecastError, Result};
use crate::utils::stats;
use serde::{Deserialize, Serialize};

/// Smallest series the decomposition accepts.
const MIN_LENGTH: usize = 8;

/// Result of a classical decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    /// Trend component.
    pub trend: Vec<f64>,
    /// Seasonal component (all zeros without a period).
    pub seasonal: Vec<f64>,
    /// Remainder component.
    pub remainder: Vec<f64>,
    /// Seasonal period used, if any.
    pub period: Option<usize>,
}

impl Decomposition {
    /// Seasonal strength (0 to 1).
    pub fn seasonal_strength(&self) -> f64 {
        seasonal_strength(&self.seasonal, &self.remainder)
    }

    /// Trend strength (0 to 1).
    pub fn trend_strength(&self) -> f64 {
        seasonal_strength(&self.trend, &self.remainder)
    }

    /// The series with the trend removed.
    pub fn detrended(&self) -> Vec<f64> {
        self.seasonal
            .iter()
            .zip(&self.remainder)
            .map(|(s, r)| s + r)
            .collect()
    }
}

/// Decompose with a period detected from periodogram peaks.
///
/// # Errors
/// `InsufficientData` for fewer than eight observations.
pub fn seasonal_decompose(data: &[f64]) -> Result<Decomposition> {
    let detected = detect_seasonal_periods(data, &SeasonalityConfig::default().with_max_periods(1))?;
    decompose(data, detected.first().map(|d| d.period))
}

/// Decompose with a caller-supplied period.
pub fn seasonal_decompose_with_period(data: &[f64], period: usize) -> Result<Decomposition> {
    if period < 2 {
        return Err(ForecastError::InvalidArgument(format!(
            "seasonal period must be >= 2, got {period}"
        )));
    }
    decompose(data, Some(period))
}

fn decompose(data: &[f64], period: Option<usize>) -> Result<Decomposition> {
    let n = data.len();
    if n < MIN_LENGTH {
        return Err(ForecastError::InsufficientData {
            needed: MIN_LENGTH,
            got: n,
        });
    }

    let trend = centered_moving_average(data, 12.min(n / 4));
    let detrended: Vec<f64> = data.iter().zip(&trend).map(|(x, t)| x - t).collect();

    let seasonal = match period {
        Some(m) if m < n => {
            let indices = phase_means(&detrended, m);
            (0..n).map(|t| indices[t % m]).collect()
        }
        _ => vec![0.0; n],
    };

    let remainder = detrended.iter().zip(&seasonal).map(|(d, s)| d - s).collect();

    Ok(Decomposition {
        trend,
        seasonal,
        remainder,
        period,
    })
}

/// Phase averages of `values` at period `m`, centered to sum to zero.
fn phase_means(values: &[f64], m: usize) -> Vec<f64> {
    let means: Vec<f64> = (0..m)
        .map(|phase| {
            let group: Vec<f64> = values.iter().skip(phase).step_by(m).copied().collect();
            stats::mean(&group)
        })
        .collect();
    let overall = stats::mean(&means);
    means.iter().map(|v| v - overall).collect()
}

/// Centered moving average; even windows use the `2×window` weighting.
/// The edges, where the window does not fit, repeat the nearest average.
fn centered_moving_average(data: &[f64], window: usize) -> Vec<f64> {
    let n = data.len();
    if window < 2 {
        return data.to_vec();
    }

    let half = window / 2;
    let weights: Vec<f64> = if window % 2 == 1 {
        vec![1.0 / window as f64; window]
    } else {
        let mut w = vec![1.0 / window as f64; window + 1];
        w[0] /= 2.0;
        w[window] /= 2.0;
        w
    };

    let mut trend = vec![f64::NAN; n];
    for t in half..n - half {
        trend[t] = weights
            .iter()
            .enumerate()
            .map(|(i, w)| w * data[t + i - half])
            .sum();
    }

    let first = trend[half];
    let last = trend[n - half - 1];
    trend[..half].fill(first);
    trend[n - half..].fill(last);
    trend
}
