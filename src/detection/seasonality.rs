//! Seasonal period detection.
//!
//! Candidate periods come from periodogram peaks; a candidate is kept only
//! when the sample autocorrelation at that lag clears the white-noise band
//! `z / √n`.

use super::fft::periodogram;
use crate::error::{ForecastError, Result};
use crate::utils::stats;
use serde::{Deserialize, Serialize};

/// A detected seasonal period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedPeriod {
    /// Period in observations.
    pub period: usize,
    /// Periodogram power at the peak.
    pub power: f64,
    /// Sample autocorrelation at lag `period`.
    pub autocorrelation: f64,
}

/// Configuration for seasonality detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityConfig {
    /// Minimum period to consider.
    pub min_period: usize,
    /// Maximum period to consider; `None` allows up to `n/2`.
    pub max_period: Option<usize>,
    /// Most periods returned.
    pub max_periods: usize,
    /// Normal quantile of the autocorrelation significance band.
    pub z: f64,
}

impl Default for SeasonalityConfig {
    fn default() -> Self {
        Self {
            min_period: 2,
            max_period: None,
            max_periods: 2,
            z: 1.96,
        }
    }
}

impl SeasonalityConfig {
    /// Set maximum period.
    pub fn with_max_period(mut self, max: usize) -> Self {
        self.max_period = Some(max);
        self
    }

    /// Set minimum period.
    pub fn with_min_period(mut self, min: usize) -> Self {
        self.min_period = min;
        self
    }

    /// Set how many periods may be returned.
    pub fn with_max_periods(mut self, max_periods: usize) -> Self {
        self.max_periods = max_periods;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_period < 2 {
            return Err(ForecastError::InvalidConfig(format!(
                "minimum seasonal period must be >= 2, got {}",
                self.min_period
            )));
        }
        if self.max_period.is_some_and(|max| max < self.min_period) {
            return Err(ForecastError::InvalidConfig(
                "maximum seasonal period is below the minimum".to_string(),
            ));
        }
        if !(self.z.is_finite() && self.z > 0.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "significance quantile must be positive, got {}",
                self.z
            )));
        }
        Ok(())
    }
}

/// Detect up to `max_periods` seasonal periods, strongest first.
///
/// Returns an empty list for series without significant seasonality.
pub fn detect_seasonal_periods(data: &[f64], config: &SeasonalityConfig) -> Result<Vec<DetectedPeriod>> {
    config.validate()?;
    let n = data.len();
    if n < 2 * config.min_period {
        return Ok(Vec::new());
    }

    let max_period = config.max_period.unwrap_or(n / 2).min(n / 2);
    let threshold = config.z / (n as f64).sqrt();
    let pg = periodogram(data);

    let mut detected: Vec<DetectedPeriod> = Vec::new();
    for idx in pg.peaks() {
        if detected.len() >= config.max_periods {
            break;
        }
        let Some(period) = pg.period_at(idx) else {
            continue;
        };
        if period < config.min_period
            || period > max_period
            || detected.iter().any(|d| d.period == period)
        {
            continue;
        }
        let autocorrelation = stats::autocorrelation(data, period);
        if autocorrelation > threshold {
            detected.push(DetectedPeriod {
                period,
                power: pg.power[idx],
                autocorrelation,
            });
        }
    }

    Ok(detected)
}

/// Estimate the strength of seasonality from a decomposition.
///
/// `1 - Var(remainder) / Var(seasonal + remainder)`, clamped to 0..=1.
pub fn seasonal_strength(seasonal: &[f64], remainder: &[f64]) -> f64 {
    let seasonal_plus_remainder: Vec<f64> = seasonal
        .iter()
        .zip(remainder)
        .map(|(s, r)| s + r)
        .collect();
    let var_sr = stats::variance(&seasonal_plus_remainder);

    if !(var_sr > 1e-10) {
        return 0.0;
    }
    (1.0 - stats::variance(remainder) / var_sr).clamp(0.0, 1.0)
}
