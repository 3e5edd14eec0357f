//! Stationarity tests for time series.
//!
//! A simplified Augmented Dickey-Fuller regression test (null: unit root)
//! and the KPSS test (null: level stationarity).

use crate::utils::ols::ols_estimate;
use crate::utils::stats;
use serde::{Deserialize, Serialize};

/// Result of a stationarity test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// P-value (approximate)
    pub p_value: f64,
    /// Number of lags used
    pub lags: usize,
    /// Whether series appears stationary at 5%
    pub is_stationary: bool,
    /// Critical values at common significance levels
    pub critical_values: CriticalValues,
}

impl StationarityResult {
    fn undefined(lags: usize, critical_values: CriticalValues) -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags,
            is_stationary: false,
            critical_values,
        }
    }
}

/// Critical values for stationarity tests.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CriticalValues {
    /// Critical value at 1% significance
    pub cv_1pct: f64,
    /// Critical value at 5% significance
    pub cv_5pct: f64,
    /// Critical value at 10% significance
    pub cv_10pct: f64,
}

/// MacKinnon critical values for the constant-only ADF regression.
const ADF_CRITICAL: CriticalValues = CriticalValues {
    cv_1pct: -3.43,
    cv_5pct: -2.86,
    cv_10pct: -2.57,
};

/// KPSS level-stationarity critical values.
const KPSS_CRITICAL: CriticalValues = CriticalValues {
    cv_1pct: 0.739,
    cv_5pct: 0.463,
    cv_10pct: 0.347,
};

/// Augmented Dickey-Fuller test for a unit root.
///
/// Fits `Δy_t = α + β·y_{t-1} + Σγ_i·Δy_{t-i} + ε_t` by OLS for each lag
/// order up to `max_lags` (default `(n-1)^(1/3)`), keeps the order with the
/// lowest AIC on a common sample, and reports the t-statistic of `β`.
/// Rejection (statistic below the 5% critical value) implies stationarity.
pub fn adf_test(series: &[f64], max_lags: Option<usize>) -> StationarityResult {
    let n = series.len();
    if n < 8 {
        return StationarityResult::undefined(0, ADF_CRITICAL);
    }

    let max_lags = max_lags
        .unwrap_or_else(|| ((n - 1) as f64).powf(1.0 / 3.0).floor() as usize)
        .min(n / 2 - 2);

    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(usize, f64, f64)> = None;
    for lag in 0..=max_lags {
        if let Some((aic, t_stat)) = adf_regression(&diff, series, lag, max_lags) {
            if best.map_or(true, |(_, best_aic, _)| aic < best_aic) {
                best = Some((lag, aic, t_stat));
            }
        }
    }

    let Some((lag, _, t_stat)) = best else {
        return StationarityResult::undefined(0, ADF_CRITICAL);
    };

    StationarityResult {
        statistic: t_stat,
        p_value: adf_p_value(t_stat),
        lags: lag,
        is_stationary: t_stat < ADF_CRITICAL.cv_5pct,
        critical_values: ADF_CRITICAL,
    }
}

/// One ADF regression with `lag` augmentation terms over the sample that
/// starts after `max_lags`, so every order sees the same observations.
/// Returns `(aic, t-statistic of β)`.
fn adf_regression(diff: &[f64], level: &[f64], lag: usize, max_lags: usize) -> Option<(f64, f64)> {
    let rows: Vec<Vec<f64>> = (max_lags..diff.len())
        .map(|t| {
            let mut row = Vec::with_capacity(lag + 2);
            row.push(1.0);
            row.push(level[t]);
            row.extend((1..=lag).map(|i| diff[t - i]));
            row
        })
        .collect();
    let y = &diff[max_lags..];

    let fit = ols_estimate(&rows, y).ok()?;
    let t_stat = fit.t_statistic(1);
    if !t_stat.is_finite() || fit.rss <= 0.0 {
        return None;
    }

    let effective_n = y.len() as f64;
    let k = (lag + 2) as f64;
    let aic = effective_n * (fit.rss / effective_n).ln() + 2.0 * k;
    Some((aic, t_stat))
}

/// Approximate p-value by interpolating the MacKinnon tau distribution.
fn adf_p_value(t_stat: f64) -> f64 {
    if t_stat.is_nan() {
        return f64::NAN;
    }

    // (statistic, p-value) knots of the constant-only tau distribution
    const KNOTS: [(f64, f64); 9] = [
        (-4.0, 0.001),
        (-3.43, 0.01),
        (-2.86, 0.05),
        (-2.57, 0.10),
        (-1.94, 0.30),
        (-1.62, 0.45),
        (-1.28, 0.60),
        (-0.84, 0.75),
        (0.0, 0.95),
    ];

    if t_stat <= KNOTS[0].0 {
        return KNOTS[0].1;
    }
    for pair in KNOTS.windows(2) {
        let ((x0, p0), (x1, p1)) = (pair[0], pair[1]);
        if t_stat <= x1 {
            return p0 + (p1 - p0) * (t_stat - x0) / (x1 - x0);
        }
    }
    0.95 + 0.05 * (1.0 - (-t_stat).exp())
}

/// KPSS test for level stationarity.
///
/// Rejection implies non-stationarity.
///
/// # Arguments
/// * `series` - Time series data
/// * `lags` - Number of lags for HAC variance (default: 4*(n/100)^0.25)
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> StationarityResult {
    let n = series.len();
    if n < 4 {
        return StationarityResult::undefined(0, KPSS_CRITICAL);
    }

    let lags = lags
        .unwrap_or_else(|| (4.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize)
        .min(n / 2)
        .max(1);

    let mean = stats::mean(series);
    let residuals: Vec<f64> = series.iter().map(|x| x - mean).collect();

    let numerator: f64 = residuals
        .iter()
        .scan(0.0, |sum, r| {
            *sum += r;
            Some(*sum * *sum)
        })
        .sum::<f64>()
        / (n * n) as f64;

    // Bartlett-kernel long-run variance
    let mut variance = residuals.iter().map(|r| r * r).sum::<f64>() / n as f64;
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        let autocovariance: f64 = residuals
            .iter()
            .skip(j)
            .zip(&residuals)
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        variance += 2.0 * weight * autocovariance;
    }

    if variance <= 0.0 {
        return StationarityResult {
            is_stationary: true,
            ..StationarityResult::undefined(lags, KPSS_CRITICAL)
        };
    }

    let statistic = numerator / variance;
    StationarityResult {
        statistic,
        p_value: kpss_p_value(statistic),
        lags,
        is_stationary: statistic < KPSS_CRITICAL.cv_5pct,
        critical_values: KPSS_CRITICAL,
    }
}

fn kpss_p_value(stat: f64) -> f64 {
    if stat.is_nan() {
        return f64::NAN;
    }
    if stat < 0.347 {
        0.10 + 0.90 * (1.0 - stat / 0.347)
    } else if stat < 0.463 {
        0.05 + 0.05 * (0.463 - stat) / (0.463 - 0.347)
    } else if stat < 0.739 {
        0.01 + 0.04 * (0.739 - stat) / (0.739 - 0.463)
    } else {
        0.01 * (1.0 - (stat - 0.739).min(1.0))
    }
}

/// Joint reading of the ADF and KPSS tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationarityConclusion {
    /// ADF rejects a unit root and KPSS does not reject stationarity.
    Stationary,
    /// ADF does not reject and KPSS rejects.
    NonStationary,
    /// The tests disagree.
    Inconclusive,
}

/// ADF and KPSS results with their joint verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityReport {
    pub adf: StationarityResult,
    pub kpss: StationarityResult,
    pub conclusion: StationarityConclusion,
}

/// Run both ADF and KPSS and combine their verdicts.
pub fn test_stationarity(series: &[f64]) -> StationarityReport {
    let adf = adf_test(series, None);
    let kpss = kpss_test(series, None);

    let conclusion = match (adf.is_stationary, kpss.is_stationary) {
        (true, true) => StationarityConclusion::Stationary,
        (false, false) => StationarityConclusion::NonStationary,
        _ => StationarityConclusion::Inconclusive,
    };

    StationarityReport {
        adf,
        kpss,
        conclusion,
    }
}
