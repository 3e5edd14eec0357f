//! Ordinary Least Squares (OLS) regression.
//!
//! [`ols_estimate`] solves the normal equations for an arbitrary design
//! matrix and backs the regression-based tests (ADF, Breusch-Pagan, White).
//! [`ols_fit`] regresses a target on named regressors with an intercept and
//! is how SARIMAX models handle exogenous variables.

use crate::error::{ForecastError, Result};
use crate::utils::linalg::{inverse, mat_vec, transpose, Matrix};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Full OLS estimate for a design matrix.
#[derive(Debug, Clone)]
pub struct OlsEstimate {
    /// Coefficients, one per design column.
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients.
    pub std_errors: Vec<f64>,
    /// Fitted values `X @ beta`.
    pub fitted: Vec<f64>,
    /// Residuals `y - X @ beta`.
    pub residuals: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Residual variance `rss / (n - k)`.
    pub sigma2: f64,
    /// Coefficient of determination (centered).
    pub r_squared: f64,
}

impl OlsEstimate {
    /// t-statistic of coefficient `i`.
    pub fn t_statistic(&self, i: usize) -> f64 {
        let se = self.std_errors[i];
        if se > 0.0 {
            self.coefficients[i] / se
        } else {
            f64::NAN
        }
    }
}

/// Estimate `y = X beta + e` via the normal equations `(X'X)^-1 X'y`.
///
/// `x` holds one row per observation. The caller supplies the intercept
/// column if one is wanted.
///
/// # Errors
/// - `InsufficientData` when there are not more rows than columns
/// - `DimensionMismatch` when `x` and `y` disagree in length
/// - `InvalidArgument` when `X'X` is singular (collinear design)
pub fn ols_estimate(x: &[Vec<f64>], y: &[f64]) -> Result<OlsEstimate> {
    let n = y.len();
    if x.len() != n {
        return Err(ForecastError::DimensionMismatch {
            expected: n,
            got: x.len(),
        });
    }
    let k = x.first().map(|r| r.len()).unwrap_or(0);
    if k == 0 || n <= k {
        return Err(ForecastError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }

    let xt = transpose(x);
    let xtx: Matrix = xt
        .iter()
        .map(|ci| {
            xt.iter()
                .map(|cj| ci.iter().zip(cj).map(|(a, b)| a * b).sum())
                .collect()
        })
        .collect();
    let xty: Vec<f64> = xt
        .iter()
        .map(|ci| ci.iter().zip(y).map(|(a, b)| a * b).sum())
        .collect();

    let xtx_inv = inverse(&xtx)?;
    let coefficients = mat_vec(&xtx_inv, &xty)?;
    let fitted = mat_vec(x, &coefficients)?;
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, f)| a - f).collect();

    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let sigma2 = rss / (n - k) as f64;

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

    let std_errors = (0..k)
        .map(|i| (sigma2 * xtx_inv[i][i]).max(0.0).sqrt())
        .collect();

    Ok(OlsEstimate {
        coefficients,
        std_errors,
        fitted,
        residuals,
        rss,
        sigma2,
        r_squared,
    })
}

/// OLS regression coefficients and intercept for named regressors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OLSResult {
    /// Regression coefficients (one per regressor).
    pub coefficients: Vec<f64>,
    /// Intercept term.
    pub intercept: f64,
    /// Names of regressors in order.
    pub regressor_names: Vec<String>,
}

impl OLSResult {
    /// Predict values using the fitted OLS model.
    ///
    /// Every regressor seen during fitting must be present with the same length.
    pub fn predict(&self, regressors: &HashMap<String, Vec<f64>>) -> Result<Vec<f64>> {
        let first_name = self
            .regressor_names
            .first()
            .ok_or_else(|| ForecastError::InvalidArgument("no regressor names stored".into()))?;

        let n = regressors
            .get(first_name)
            .ok_or_else(|| {
                ForecastError::InvalidArgument(format!(
                    "missing regressor '{first_name}' in prediction data"
                ))
            })?
            .len();

        let mut predictions = vec![self.intercept; n];
        for (name, coef) in self.regressor_names.iter().zip(&self.coefficients) {
            let values = regressors.get(name).ok_or_else(|| {
                ForecastError::InvalidArgument(format!(
                    "missing regressor '{name}' in prediction data"
                ))
            })?;
            if values.len() != n {
                return Err(ForecastError::DimensionMismatch {
                    expected: n,
                    got: values.len(),
                });
            }
            for (pred, x) in predictions.iter_mut().zip(values) {
                *pred += coef * x;
            }
        }

        Ok(predictions)
    }

    /// Get the number of regressors.
    pub fn num_regressors(&self) -> usize {
        self.coefficients.len()
    }
}

/// Fit `y = intercept + X @ coefficients` on named regressors.
///
/// Regressor names are sorted so the coefficient order is deterministic.
pub fn ols_fit(y: &[f64], regressors: &HashMap<String, Vec<f64>>) -> Result<OLSResult> {
    let n = y.len();
    if n == 0 {
        return Err(ForecastError::EmptyData);
    }

    let mut regressor_names: Vec<String> = regressors.keys().cloned().collect();
    regressor_names.sort();

    if regressor_names.is_empty() {
        return Ok(OLSResult {
            coefficients: vec![],
            intercept: y.iter().sum::<f64>() / n as f64,
            regressor_names,
        });
    }

    for name in &regressor_names {
        let len = regressors[name].len();
        if len != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: len,
            });
        }
    }

    let design: Matrix = (0..n)
        .map(|obs| {
            std::iter::once(1.0)
                .chain(regressor_names.iter().map(|name| regressors[name][obs]))
                .collect()
        })
        .collect();

    let estimate = ols_estimate(&design, y)?;

    Ok(OLSResult {
        intercept: estimate.coefficients[0],
        coefficients: estimate.coefficients[1..].to_vec(),
        regressor_names,
    })
}
