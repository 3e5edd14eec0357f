//! Seasonal ARIMA model with optional exogenous regressors.
//!
//! The series is differenced (seasonal passes first, then regular), the
//! combined differenced series is standardized, and the multiplicative ARMA
//! coefficients are estimated by maximizing the conditional Gaussian
//! log-likelihood with Newton-Raphson. Exogenous regressors are handled as
//! regression with SARIMA errors.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::config::ModelConfig;
use crate::models::arima::diff::{difference, difference_chain, integrate_chain, seasonal_difference};
use crate::models::Forecaster;
use crate::transform::ScaleParams;
use crate::utils::metrics::MetricValue;
use crate::utils::ols::{ols_fit, OLSResult};
use crate::utils::optimization::{newton_raphson, NewtonConfig};
use crate::utils::stats;
use crate::validation::residual_tests::{ljung_box, LjungBoxResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

const COVARIANCE_RIDGE: f64 = 1e-6;
const MIN_INNOVATION_VARIANCE: f64 = 1e-12;

/// Everything a fit produces. Owned by one model; replaced by each refit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedState {
    /// ARMA coefficients: `[φ.., θ.., then Φ.., Θ.. per seasonal component]`.
    pub parameters: Vec<f64>,
    /// In-sample one-step residuals in the units of the differenced series.
    pub residuals: Vec<f64>,
    /// Means of each seasonal component's differenced series, then of the combined series.
    pub means: Vec<f64>,
    /// Standard deviations, aligned with `means`.
    pub stds: Vec<f64>,
    /// Inverse observed information of `parameters`.
    pub parameter_covariance: Vec<Vec<f64>>,
    /// Conditional log-likelihood in the units of the differenced series.
    pub log_likelihood: f64,
    /// Innovation variance in the units of the differenced series.
    pub sigma2: f64,
    /// Series the ARMA part was fit to (after removing any regression).
    pub observations: Vec<f64>,
    /// Regression on exogenous variables, if any were supplied.
    pub regression: Option<OLSResult>,
    /// In-sample regression contribution, aligned with `observations`.
    #[serde(default)]
    pub regression_fit: Vec<f64>,
    /// Newton-Raphson iterations used.
    pub iterations: usize,
}

/// Estimate with standard error and significance for one coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    pub name: String,
    pub value: f64,
    pub std_error: f64,
    pub t_statistic: MetricValue,
    pub p_value: MetricValue,
}

/// Information criteria, residual moments and parameter significance.
#[derive(Debug, Clone)]
pub struct ModelDiagnostics {
    pub log_likelihood: f64,
    /// Estimated parameters including the innovation variance.
    pub num_parameters: usize,
    /// Residuals entering the likelihood.
    pub observations: usize,
    pub aic: f64,
    pub bic: f64,
    pub aicc: MetricValue,
    pub hqic: f64,
    /// Final prediction error.
    pub fpe: MetricValue,
    pub sigma2: f64,
    pub residual_mean: f64,
    pub residual_variance: f64,
    pub residual_skewness: f64,
    pub residual_kurtosis: f64,
    pub parameters: Vec<ParameterEstimate>,
    pub ljung_box: LjungBoxResult,
}

/// SARIMA(p,d,q)(P,D,Q)[m]... model, optionally with exogenous regressors.
///
/// # Example
/// ```
/// use sarimax_forecast::models::arima::{ModelConfig, ModelOrder, SeasonalModel};
/// use sarimax_forecast::models::Forecaster;
///
/// let values = [100.0, 102.0, 101.0, 105.0, 107.0, 104.0, 108.0, 110.0, 109.0, 113.0];
/// let mut model = SeasonalModel::new(ModelConfig::new(ModelOrder::new(1, 1, 0))).unwrap();
/// model.fit_values(&values).unwrap();
///
/// let forecast = model.predict(3).unwrap();
/// assert_eq!(forecast.horizon(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct SeasonalModel {
    config: ModelConfig,
    name: String,
    state: Option<FittedState>,
    fitted: Option<Vec<f64>>,
}

impl SeasonalModel {
    /// Create an unfitted model.
    ///
    /// # Errors
    /// `InvalidConfig` when the configuration violates an invariant.
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: config.to_string(),
            config,
            state: None,
            fitted: None,
        })
    }

    /// Restore a fitted model from persisted state without refitting.
    pub fn from_state(config: ModelConfig, state: FittedState) -> Result<Self> {
        let mut model = Self::new(config)?;
        let expected = model.config.num_parameters();
        if state.parameters.len() != expected {
            return Err(ForecastError::DimensionMismatch {
                expected,
                got: state.parameters.len(),
            });
        }
        if let Some(row) = state.parameter_covariance.iter().find(|row| row.len() != expected) {
            return Err(ForecastError::DimensionMismatch {
                expected,
                got: row.len(),
            });
        }
        if state.parameter_covariance.len() != expected {
            return Err(ForecastError::DimensionMismatch {
                expected,
                got: state.parameter_covariance.len(),
            });
        }
        let components = model.config.seasonal_orders.len() + 1;
        for moments in [&state.means, &state.stds] {
            if moments.len() != components {
                return Err(ForecastError::DimensionMismatch {
                    expected: components,
                    got: moments.len(),
                });
            }
        }
        let offset = model.residual_offset();
        if state.observations.len() != offset + state.residuals.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: offset + state.residuals.len(),
                got: state.observations.len(),
            });
        }
        // Empty when there are no regressors, else one value per observation.
        let fit_len = state.regression_fit.len();
        if fit_len != 0 && fit_len != state.observations.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: state.observations.len(),
                got: fit_len,
            });
        }
        model.fitted = Some(fitted_from(&state, offset));
        model.state = Some(state);
        Ok(model)
    }

    /// A fresh, unfitted model with the same configuration.
    pub fn unfitted(&self) -> Self {
        Self {
            config: self.config.clone(),
            name: self.name.clone(),
            state: None,
            fitted: None,
        }
    }

    /// The model configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The fitted state, if fitted.
    pub fn fitted_state(&self) -> Option<&FittedState> {
        self.state.as_ref()
    }

    /// Estimated ARMA coefficients.
    pub fn parameters(&self) -> Result<&[f64]> {
        self.state
            .as_ref()
            .map(|s| s.parameters.as_slice())
            .ok_or(ForecastError::ModelNotFitted)
    }

    /// Non-seasonal AR coefficients.
    pub fn ar_coefficients(&self) -> Result<&[f64]> {
        Ok(&self.parameters()?[..self.config.order.p])
    }

    /// Non-seasonal MA coefficients.
    pub fn ma_coefficients(&self) -> Result<&[f64]> {
        let p = self.config.order.p;
        Ok(&self.parameters()?[p..p + self.config.order.q])
    }

    /// Fit to raw values without exogenous regressors.
    pub fn fit_values(&mut self, values: &[f64]) -> Result<()> {
        self.fit_with(values, &HashMap::new())
    }

    /// Fit to values with named exogenous regressors aligned to them.
    pub fn fit_with(&mut self, values: &[f64], regressors: &HashMap<String, Vec<f64>>) -> Result<()> {
        self.state = None;
        self.fitted = None;

        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidArgument(
                "series contains missing or non-finite values".to_string(),
            ));
        }
        let needed = self.config.min_observations();
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let (observations, regression, regression_fit) = if regressors.is_empty() {
            (values.to_vec(), None, Vec::new())
        } else {
            if regressors.values().flatten().any(|v| !v.is_finite()) {
                return Err(ForecastError::InvalidArgument(
                    "exogenous regressors contain missing values".to_string(),
                ));
            }
            let ols = ols_fit(values, regressors)?;
            let explained = ols.predict(regressors)?;
            let errors = values.iter().zip(&explained).map(|(y, x)| y - x).collect();
            (errors, Some(ols), explained)
        };

        let (means, stds) = self.component_moments(&observations);
        let std = stds[stds.len() - 1];
        let scaling = ScaleParams {
            center: means[means.len() - 1],
            scale: std,
        };

        let differenced = difference_chain(&observations, &self.config.difference_lags());
        let w = scaling.transform(&differenced);

        let initial = initial_parameters(&w, &self.config);
        let config = &self.config;
        let objective = |params: &[f64]| log_likelihood(&w, config, params);
        let newton = NewtonConfig::default()
            .with_max_iterations(config.max_iterations)
            .with_tolerance(config.tolerance);

        let result = newton_raphson(objective, &initial, &newton)?;
        let covariance = result.covariance(COVARIANCE_RIDGE);

        let (ar, ma) = polynomials(config, &result.parameters);
        let standardized_residuals = css_residuals(&w, &ar, &ma);
        let n_eff = standardized_residuals.len() as f64;
        let ss: f64 = standardized_residuals.iter().map(|e| e * e).sum();
        // Back to the units of the differenced series so criteria compare
        // across differencing orders and data scales.
        let log_likelihood = result.value - n_eff * std.ln();

        let state = FittedState {
            residuals: standardized_residuals.iter().map(|e| e * std).collect(),
            sigma2: (ss / n_eff) * std * std,
            parameters: result.parameters,
            means,
            stds,
            parameter_covariance: covariance,
            log_likelihood,
            observations,
            regression,
            regression_fit,
            iterations: result.iterations,
        };

        debug!(
            model = %self.name,
            iterations = state.iterations,
            log_likelihood = state.log_likelihood,
            "fitted seasonal model"
        );

        self.fitted = Some(fitted_from(&state, self.residual_offset()));
        self.state = Some(state);
        Ok(())
    }

    /// Means and standard deviations of each seasonal component's differenced
    /// series followed by the combined series.
    fn component_moments(&self, observations: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let d = self.config.order.d;
        let mut series: Vec<Vec<f64>> = self
            .config
            .seasonal_orders
            .iter()
            .map(|s| difference(&seasonal_difference(observations, s.order.d, s.period), d))
            .collect();
        series.push(difference_chain(observations, &self.config.difference_lags()));

        series
            .iter()
            .map(|x| {
                let mean = if x.is_empty() { 0.0 } else { stats::mean(x) };
                let mut std = stats::std_dev(x);
                if !(std.is_finite() && std > 0.0) {
                    warn!(model = %self.name, "differenced series has zero variance");
                    std = 1.0;
                }
                (mean, std)
            })
            .unzip()
    }

    /// Index into the observations of the first residual.
    fn residual_offset(&self) -> usize {
        self.config.difference_loss() + self.config.ar_span()
    }

    fn state(&self) -> Result<&FittedState> {
        self.state.as_ref().ok_or(ForecastError::ModelNotFitted)
    }

    /// Forecast the ARMA part, returning level forecasts and forecast
    /// standard errors.
    fn forecast_errors_part(&self, horizon: usize) -> Result<(Vec<f64>, Vec<f64>)> {
        let state = self.state()?;
        let lags = self.config.difference_lags();
        let scaling = ScaleParams {
            center: state.means[state.means.len() - 1],
            scale: state.stds[state.stds.len() - 1],
        };
        let std = scaling.scale;
        let (ar, ma) = polynomials(&self.config, &state.parameters);

        let mut w = scaling.transform(&difference_chain(&state.observations, &lags));
        let start = w.len() - state.residuals.len();
        let mut e: Vec<f64> = vec![0.0; start];
        e.extend(state.residuals.iter().map(|r| r / std));

        for _ in 0..horizon {
            let t = w.len();
            let mut next = 0.0;
            for j in 1..ar.len() {
                next -= ar[j] * w[t - j];
            }
            for j in 1..ma.len().min(t + 1) {
                next += ma[j] * e[t - j];
            }
            w.push(next);
            e.push(0.0);
        }

        let differenced = scaling.inverse(&w[w.len() - horizon..]);
        let levels = integrate_chain(&differenced, &state.observations, &lags);

        let psi = psi_weights(&ar, &ma, &lags, horizon);
        let mut cumulative = 0.0;
        let std_errors = psi
            .iter()
            .map(|p| {
                cumulative += p * p;
                (state.sigma2 * cumulative).sqrt()
            })
            .collect();

        Ok((levels, std_errors))
    }

    /// Forecast with caller-supplied future regressor values.
    ///
    /// Every regressor used in fitting must be present with `horizon` values.
    /// With `level`, the forecast carries prediction intervals.
    pub fn predict_with_regressors(
        &self,
        horizon: usize,
        future: &HashMap<String, Vec<f64>>,
        level: Option<f64>,
    ) -> Result<Forecast> {
        let state = self.state()?;
        let offset = match &state.regression {
            Some(ols) => {
                for (name, values) in future {
                    if values.len() != horizon {
                        return Err(ForecastError::InvalidArgument(format!(
                            "future regressor '{name}' has {} values for horizon {horizon}",
                            values.len()
                        )));
                    }
                }
                ols.predict(future)?
            }
            None => vec![0.0; horizon],
        };
        self.assemble(horizon, level)?.shifted(&offset)
    }

    fn assemble(&self, horizon: usize, level: Option<f64>) -> Result<Forecast> {
        if horizon == 0 {
            self.state()?;
            return Ok(Forecast::new());
        }
        let (levels, std_errors) = self.forecast_errors_part(horizon)?;

        match level {
            None => Ok(Forecast::from_values(levels)),
            Some(level) => {
                if !(level > 0.0 && level < 1.0) {
                    return Err(ForecastError::InvalidArgument(format!(
                        "confidence level must be in (0, 1), got {level}"
                    )));
                }
                let z = stats::normal_inverse_cdf((1.0 + level) / 2.0, 0.0, 1.0)?;
                let lower = levels.iter().zip(&std_errors).map(|(p, s)| p - z * s).collect();
                let upper = levels.iter().zip(&std_errors).map(|(p, s)| p + z * s).collect();
                Forecast::from_values_with_intervals(levels, lower, upper, level)
            }
        }
    }

    fn require_no_regression(&self) -> Result<()> {
        if self.state()?.regression.is_some() {
            return Err(ForecastError::InvalidArgument(
                "model was fit with exogenous regressors; use predict_with_regressors".to_string(),
            ));
        }
        Ok(())
    }

    /// Information criteria, residual moments, parameter significance and a
    /// Ljung-Box test on the residuals.
    ///
    /// `n` is the number of conditional residuals. BIC exceeds AIC only
    /// when `ln(n) > 2`, so for fewer than 8 residuals BIC is the smaller.
    pub fn diagnostics(&self) -> Result<ModelDiagnostics> {
        let state = self.state()?;
        let n = state.residuals.len();
        let n_f = n as f64;
        let regression_terms = state
            .regression
            .as_ref()
            .map(|r| r.num_regressors() + 1)
            .unwrap_or(0);
        let k = self.config.num_parameters() + regression_terms + 1;
        let k_f = k as f64;
        let ll = state.log_likelihood;

        let aic = -2.0 * ll + 2.0 * k_f;
        let bic = -2.0 * ll + k_f * n_f.ln();
        let hqic = -2.0 * ll + 2.0 * k_f * n_f.ln().ln();
        let aicc = if n > k + 1 {
            MetricValue::from_f64(aic + 2.0 * k_f * (k_f + 1.0) / (n_f - k_f - 1.0))
        } else {
            MetricValue::Undefined
        };
        let fpe = if n > k {
            MetricValue::from_f64(state.sigma2 * (n_f + k_f) / (n_f - k_f))
        } else {
            MetricValue::Undefined
        };

        let parameters = parameter_names(&self.config)
            .into_iter()
            .zip(&state.parameters)
            .enumerate()
            .map(|(i, (name, &value))| {
                let std_error = state.parameter_covariance[i][i].max(0.0).sqrt();
                let t = if std_error > 0.0 {
                    MetricValue::from_f64(value / std_error)
                } else {
                    MetricValue::Undefined
                };
                ParameterEstimate {
                    name,
                    value,
                    std_error,
                    t_statistic: t,
                    p_value: match t {
                        MetricValue::Defined(t) => {
                            MetricValue::from_f64(stats::two_sided_normal_p_value(t))
                        }
                        MetricValue::Undefined => MetricValue::Undefined,
                    },
                }
            })
            .collect();

        Ok(ModelDiagnostics {
            log_likelihood: ll,
            num_parameters: k,
            observations: n,
            aic,
            bic,
            aicc,
            hqic,
            fpe,
            sigma2: state.sigma2,
            residual_mean: stats::mean(&state.residuals),
            residual_variance: stats::variance(&state.residuals),
            residual_skewness: stats::skewness(&state.residuals),
            residual_kurtosis: stats::kurtosis(&state.residuals),
            parameters,
            ljung_box: ljung_box(&state.residuals, None, self.config.num_parameters()),
        })
    }
}

impl Forecaster for SeasonalModel {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.fit_with(series.values(), series.regressors())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.require_no_regression()?;
        self.assemble(horizon, None)
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.require_no_regression()?;
        self.assemble(horizon, Some(level))
    }

    fn forecast_with_exogenous(
        &self,
        horizon: usize,
        future: &HashMap<String, Vec<f64>>,
    ) -> Result<Forecast> {
        self.predict_with_regressors(horizon, future, None)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.residuals.as_slice())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_parameters(&self) -> usize {
        self.config.num_parameters()
    }
}

/// One-step in-sample predictions on the original scale.
fn fitted_from(state: &FittedState, offset: usize) -> Vec<f64> {
    state.observations[offset..]
        .iter()
        .zip(&state.residuals)
        .enumerate()
        .map(|(i, (x, e))| {
            let regression = state.regression_fit.get(offset + i).copied().unwrap_or(0.0);
            x + regression - e
        })
        .collect()
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

fn lag_polynomial(coefficients: &[f64], lag: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * lag + 1];
    poly[0] = 1.0;
    for (i, c) in coefficients.iter().enumerate() {
        poly[(i + 1) * lag] = sign * c;
    }
    poly
}

/// Expanded AR polynomial `φ(B)ΠΦ(B^m)` (as `1 - ...`) and MA polynomial
/// `θ(B)ΠΘ(B^m)` (as `1 + ...`).
fn polynomials(config: &ModelConfig, params: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let (p, q) = (config.order.p, config.order.q);
    let mut ar = lag_polynomial(&params[..p], 1, -1.0);
    let mut ma = lag_polynomial(&params[p..p + q], 1, 1.0);

    let mut idx = p + q;
    for seasonal in &config.seasonal_orders {
        let (sp, sq) = (seasonal.order.p, seasonal.order.q);
        ar = poly_mul(&ar, &lag_polynomial(&params[idx..idx + sp], seasonal.period, -1.0));
        idx += sp;
        ma = poly_mul(&ma, &lag_polynomial(&params[idx..idx + sq], seasonal.period, 1.0));
        idx += sq;
    }
    (ar, ma)
}

/// Conditional residuals; the first `ar.len() - 1` observations only seed the recursion.
fn css_residuals(w: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let start = ar.len() - 1;
    let mut e = vec![0.0; w.len()];
    for t in start..w.len() {
        let mut prediction = 0.0;
        for j in 1..ar.len() {
            prediction -= ar[j] * w[t - j];
        }
        for j in 1..ma.len().min(t + 1) {
            prediction += ma[j] * e[t - j];
        }
        e[t] = w[t] - prediction;
    }
    e.split_off(start)
}

/// Concentrated Gaussian log-likelihood of the conditional residuals.
fn log_likelihood(w: &[f64], config: &ModelConfig, params: &[f64]) -> f64 {
    let (ar, ma) = polynomials(config, params);
    let residuals = css_residuals(w, &ar, &ma);
    let n = residuals.len() as f64;
    let ss: f64 = residuals.iter().map(|e| e * e).sum();
    if !ss.is_finite() {
        return f64::NEG_INFINITY;
    }
    let sigma2 = (ss / n).max(MIN_INNOVATION_VARIANCE);
    -0.5 * n * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0)
}

/// Starting values: AR terms from the sample PACF, MA terms from half the
/// sample ACF at the matching lags.
fn initial_parameters(w: &[f64], config: &ModelConfig) -> Vec<f64> {
    let max_lag = config
        .ar_span()
        .max(config.ma_span())
        .min(w.len().saturating_sub(1));
    let pacf = stats::pacf(w, max_lag);
    let acf = stats::acf(w, max_lag);
    let at = |values: &[f64], lag: usize, scale: f64| {
        values
            .get(lag)
            .map(|v| (scale * v).clamp(-0.9, 0.9))
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    };

    let mut params = Vec::with_capacity(config.num_parameters());
    params.extend((1..=config.order.p).map(|i| at(&pacf, i, 1.0)));
    params.extend((1..=config.order.q).map(|j| at(&acf, j, 0.5)));
    for seasonal in &config.seasonal_orders {
        let m = seasonal.period;
        params.extend((1..=seasonal.order.p).map(|i| at(&pacf, i * m, 1.0)));
        params.extend((1..=seasonal.order.q).map(|j| at(&acf, j * m, 0.5)));
    }
    params
}

/// MA(∞) weights of the integrated model `ψ(B) = θ(B) / (φ(B) Π(1 - B^lag))`.
fn psi_weights(ar: &[f64], ma: &[f64], lags: &[usize], horizon: usize) -> Vec<f64> {
    let integrated = lags.iter().fold(ar.to_vec(), |acc, &lag| {
        let mut factor = vec![0.0; lag + 1];
        factor[0] = 1.0;
        factor[lag] = -1.0;
        poly_mul(&acc, &factor)
    });

    let mut psi = Vec::with_capacity(horizon);
    for j in 0..horizon {
        let mut value = if j == 0 {
            1.0
        } else {
            ma.get(j).copied().unwrap_or(0.0)
        };
        for i in 1..integrated.len().min(j + 1) {
            value -= integrated[i] * psi[j - i];
        }
        psi.push(value);
    }
    psi
}

fn parameter_names(config: &ModelConfig) -> Vec<String> {
    let mut names: Vec<String> = (1..=config.order.p).map(|i| format!("ar.L{i}")).collect();
    names.extend((1..=config.order.q).map(|i| format!("ma.L{i}")));
    for seasonal in &config.seasonal_orders {
        let m = seasonal.period;
        names.extend((1..=seasonal.order.p).map(|i| format!("ar.S.L{}", i * m)));
        names.extend((1..=seasonal.order.q).map(|i| format!("ma.S.L{}", i * m)));
    }
    names
}
