//! Cross-validation utilities for time series forecasting.
//!
//! Every fold builds a fresh model from a factory and fits it on its own
//! training slice, so folds never share fitted state.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics, MetricValue};
use crate::utils::stats;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Cross-validation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CVStrategy {
    /// Contiguous blocks; each block trains on its head and tests on its last
    /// `horizon` points.
    KFold,
    /// Rolling window: fixed training window size, slides forward.
    Rolling,
    /// Expanding window: training prefix grows with each fold.
    #[default]
    Expanding,
}

/// Configuration for time series cross-validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVConfig {
    /// Partitioning policy.
    pub strategy: CVStrategy,
    /// Number of folds.
    pub folds: usize,
    /// Forecast horizon for each fold.
    pub horizon: usize,
    /// Training window for rolling and expanding strategies. `None` uses
    /// everything before the first forecast origin.
    pub window: Option<usize>,
    /// Distance between consecutive origins; defaults to `horizon`.
    pub step_size: Option<usize>,
}

impl Default for CVConfig {
    fn default() -> Self {
        Self {
            strategy: CVStrategy::Expanding,
            folds: 5,
            horizon: 1,
            window: None,
            step_size: None,
        }
    }
}

impl CVConfig {
    /// Plain k-fold over contiguous blocks.
    pub fn k_fold(folds: usize, horizon: usize) -> Self {
        Self {
            strategy: CVStrategy::KFold,
            folds,
            horizon,
            ..Self::default()
        }
    }

    /// Rolling window of fixed size.
    pub fn rolling(window: usize, horizon: usize) -> Self {
        Self {
            strategy: CVStrategy::Rolling,
            window: Some(window),
            horizon,
            ..Self::default()
        }
    }

    /// Expanding window starting at `initial_window` observations.
    pub fn expanding(initial_window: usize, horizon: usize) -> Self {
        Self {
            strategy: CVStrategy::Expanding,
            window: Some(initial_window),
            horizon,
            ..Self::default()
        }
    }

    /// Set the number of folds.
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Set the forecast horizon.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the step size between folds.
    pub fn with_step_size(mut self, step_size: usize) -> Self {
        self.step_size = Some(step_size);
        self
    }

    /// Check option combinations.
    pub fn validate(&self) -> Result<()> {
        if self.folds < 2 {
            return Err(ForecastError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.folds
            )));
        }
        if self.horizon == 0 {
            return Err(ForecastError::InvalidConfig(
                "cross-validation horizon must be >= 1".to_string(),
            ));
        }
        if self.window == Some(0) || self.step_size == Some(0) {
            return Err(ForecastError::InvalidConfig(
                "window and step size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Train and test index ranges of one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Partition `n` observations into folds.
///
/// # Errors
/// `InvalidConfig` for invalid options; `InsufficientData` when `n` cannot
/// hold the requested folds.
pub fn fold_splits(n: usize, config: &CVConfig) -> Result<Vec<FoldSplit>> {
    config.validate()?;
    let (k, h) = (config.folds, config.horizon);

    match config.strategy {
        CVStrategy::KFold => {
            let block = n / k;
            if block <= h {
                return Err(ForecastError::InsufficientData {
                    needed: k * (h + 1),
                    got: n,
                });
            }
            Ok((0..k)
                .map(|i| {
                    let start = i * block;
                    let end = if i + 1 == k { n } else { start + block };
                    FoldSplit {
                        train: start..end - h,
                        test: end - h..end,
                    }
                })
                .collect())
        }
        CVStrategy::Rolling | CVStrategy::Expanding => {
            let step = config.step_size.unwrap_or(h);
            let span = h + (k - 1) * step;
            let first_origin = n.checked_sub(span).filter(|&o| o > 0).ok_or(
                ForecastError::InsufficientData {
                    needed: span + config.window.unwrap_or(1),
                    got: n,
                },
            )?;
            let window = config.window.unwrap_or(first_origin);
            if window > first_origin {
                return Err(ForecastError::InsufficientData {
                    needed: span + window,
                    got: n,
                });
            }

            Ok((0..k)
                .map(|i| {
                    let origin = first_origin + i * step;
                    let start = match config.strategy {
                        CVStrategy::Rolling => origin - window,
                        _ => 0,
                    };
                    FoldSplit {
                        train: start..origin,
                        test: origin..origin + h,
                    }
                })
                .collect())
        }
    }
}

/// Results from cross-validation.
#[derive(Debug, Clone)]
pub struct CVResults {
    /// Number of folds evaluated.
    pub n_folds: usize,
    /// Aggregated metrics across all folds.
    pub aggregated: AggregatedMetrics,
    /// Per-fold metrics.
    pub fold_metrics: Vec<AccuracyMetrics>,
    /// Index ranges of every fold.
    pub splits: Vec<FoldSplit>,
    /// Per-fold actual values (flattened).
    pub actual_values: Vec<f64>,
    /// Per-fold predicted values (flattened).
    pub predicted_values: Vec<f64>,
}

/// Fold means and standard errors of the mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub smape: f64,
    /// Undefined if any fold's MAPE is undefined.
    pub mape: MetricValue,
    pub mae_se: f64,
    pub rmse_se: f64,
    pub mape_se: MetricValue,
}

impl AggregatedMetrics {
    fn from_folds(folds: &[AccuracyMetrics]) -> Self {
        let mae: Vec<f64> = folds.iter().map(|m| m.mae).collect();
        let mse: Vec<f64> = folds.iter().map(|m| m.mse).collect();
        let rmse: Vec<f64> = folds.iter().map(|m| m.rmse).collect();
        let smape: Vec<f64> = folds.iter().map(|m| m.smape).collect();
        let mape: Option<Vec<f64>> = folds.iter().map(|m| m.mape.value()).collect();

        Self {
            mae: stats::mean(&mae),
            mse: stats::mean(&mse),
            rmse: stats::mean(&rmse),
            smape: stats::mean(&smape),
            mape: mape.as_deref().map(stats::mean).into(),
            mae_se: stats::standard_error(&mae),
            rmse_se: stats::standard_error(&rmse),
            mape_se: mape.as_deref().map(stats::standard_error).into(),
        }
    }
}

/// Perform time series cross-validation.
///
/// `model_factory` builds a fresh, unfitted model for each fold. Fit and
/// prediction errors of any fold abort the validation.
///
/// # Example
/// ```
/// use sarimax_forecast::core::TimeSeries;
/// use sarimax_forecast::models::arima::{ModelConfig, ModelOrder, SeasonalModel};
/// use sarimax_forecast::utils::cross_validation::{cross_validate, CVConfig};
/// use chrono::{Duration, TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let timestamps: Vec<_> = (0..40).map(|i| start + Duration::days(i)).collect();
/// let values: Vec<f64> = (0..40).map(|i| 10.0 + (i as f64 * 0.7).sin()).collect();
/// let ts = TimeSeries::univariate(timestamps, values).unwrap();
///
/// let config = CVConfig::expanding(20, 2).with_folds(4);
/// let results = cross_validate(&config, &ts, || {
///     SeasonalModel::new(ModelConfig::new(ModelOrder::new(1, 0, 0)))
/// })
/// .unwrap();
///
/// assert_eq!(results.n_folds, 4);
/// assert!(results.aggregated.rmse >= results.aggregated.mae);
/// ```
pub fn cross_validate<F, Factory>(
    config: &CVConfig,
    series: &TimeSeries,
    model_factory: Factory,
) -> Result<CVResults>
where
    F: Forecaster,
    Factory: Fn() -> Result<F>,
{
    let splits = fold_splits(series.len(), config)?;
    let values = series.values();

    let mut fold_metrics = Vec::with_capacity(splits.len());
    let mut actual_values = Vec::new();
    let mut predicted_values = Vec::new();

    for split in &splits {
        let train = series.slice(split.train.start, split.train.end)?;
        let mut model = model_factory()?;
        model.fit(&train)?;

        let future: HashMap<String, Vec<f64>> = series
            .regressors()
            .iter()
            .map(|(name, col)| (name.clone(), col[split.test.clone()].to_vec()))
            .collect();
        let forecast = model.forecast_with_exogenous(config.horizon, &future)?;

        let actual = &values[split.test.clone()];
        let metrics = calculate_metrics(
            actual,
            forecast.primary(),
            train.values(),
            model.num_parameters(),
        )?;
        fold_metrics.push(metrics);
        actual_values.extend_from_slice(actual);
        predicted_values.extend_from_slice(forecast.primary());
    }

    Ok(CVResults {
        n_folds: fold_metrics.len(),
        aggregated: AggregatedMetrics::from_folds(&fold_metrics),
        fold_metrics,
        splits,
        actual_values,
        predicted_values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Forecast;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn make_series(values: Vec<f64>) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..values.len())
            .map(|i| base + Duration::hours(i as i64))
            .collect();
        TimeSeries::univariate(timestamps, values).unwrap()
    }

    /// Repeats the last training value.
    #[derive(Default)]
    struct LastValue {
        last: Option<f64>,
    }

    impl Forecaster for LastValue {
        fn fit(&mut self, series: &TimeSeries) -> Result<()> {
            self.last = series.values().last().copied();
            Ok(())
        }

        fn predict(&self, horizon: usize) -> Result<Forecast> {
            let last = self.last.ok_or(ForecastError::ModelNotFitted)?;
            Ok(Forecast::from_values(vec![last; horizon]))
        }

        fn fitted_values(&self) -> Option<&[f64]> {
            None
        }

        fn residuals(&self) -> Option<&[f64]> {
            None
        }

        fn name(&self) -> &str {
            "LastValue"
        }
    }

    fn last_value() -> Result<LastValue> {
        Ok(LastValue::default())
    }

    #[test]
    fn expanding_origins_end_at_series_end() {
        let splits = fold_splits(20, &CVConfig::expanding(10, 2).with_folds(3)).unwrap();
        assert_eq!(
            splits,
            vec![
                FoldSplit { train: 0..14, test: 14..16 },
                FoldSplit { train: 0..16, test: 16..18 },
                FoldSplit { train: 0..18, test: 18..20 },
            ]
        );
    }

    #[test]
    fn rolling_window_keeps_size() {
        let splits = fold_splits(20, &CVConfig::rolling(8, 1).with_folds(4)).unwrap();
        assert_eq!(splits.len(), 4);
        for split in &splits {
            assert_eq!(split.train.len(), 8);
            assert_eq!(split.train.end, split.test.start);
        }
        assert_eq!(splits[3].test, 19..20);
    }

    #[test]
    fn k_fold_blocks() {
        let splits = fold_splits(20, &CVConfig::k_fold(4, 2)).unwrap();
        assert_eq!(splits.len(), 4);
        assert_eq!(splits[0], FoldSplit { train: 0..3, test: 3..5 });
        assert_eq!(splits[3], FoldSplit { train: 15..18, test: 18..20 });
    }

    #[test]
    fn step_size_spaces_origins() {
        let splits = fold_splits(30, &CVConfig::expanding(5, 1).with_folds(3).with_step_size(4)).unwrap();
        let origins: Vec<usize> = splits.iter().map(|s| s.test.start).collect();
        assert_eq!(origins, vec![21, 25, 29]);
    }

    #[test]
    fn insufficient_data() {
        assert!(matches!(
            fold_splits(5, &CVConfig::expanding(10, 1)),
            Err(ForecastError::InsufficientData { .. })
        ));
        assert!(matches!(
            fold_splits(6, &CVConfig::k_fold(3, 2)),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn invalid_config() {
        assert!(CVConfig::default().with_folds(1).validate().is_err());
        assert!(CVConfig::default().with_horizon(0).validate().is_err());
        assert!(CVConfig::rolling(0, 1).validate().is_err());
        assert!(CVConfig::default().validate().is_ok());
    }

    #[test]
    fn constant_series_has_zero_error() {
        let ts = make_series(vec![5.0; 20]);
        let results = cross_validate(&CVConfig::expanding(10, 1), &ts, last_value).unwrap();
        assert_eq!(results.n_folds, 5);
        assert_relative_eq!(results.aggregated.mae, 0.0);
        assert_relative_eq!(results.aggregated.mae_se, 0.0);
    }

    #[test]
    fn aggregates_are_fold_means_with_standard_errors() {
        let values: Vec<f64> = (0..30).map(|i| 1.0 + (i * i) as f64 * 0.1).collect();
        let ts = make_series(values);
        let results = cross_validate(&CVConfig::expanding(10, 2).with_folds(4), &ts, last_value).unwrap();

        let maes: Vec<f64> = results.fold_metrics.iter().map(|m| m.mae).collect();
        assert_relative_eq!(results.aggregated.mae, stats::mean(&maes), epsilon = 1e-12);
        assert_relative_eq!(
            results.aggregated.mae_se,
            stats::standard_error(&maes),
            epsilon = 1e-12
        );
        assert!(results.aggregated.rmse >= results.aggregated.mae);
        assert!(results.aggregated.mape.is_defined());
        assert_eq!(results.actual_values.len(), 8);
        assert_eq!(results.predicted_values.len(), 8);
    }

    #[test]
    fn zero_actual_makes_mape_undefined() {
        let mut values: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        values[19] = 0.0;
        let ts = make_series(values);
        let results = cross_validate(&CVConfig::expanding(10, 1), &ts, last_value).unwrap();
        assert_eq!(results.aggregated.mape, MetricValue::Undefined);
        assert_eq!(results.aggregated.mape_se, MetricValue::Undefined);
    }

    #[test]
    fn factory_errors_propagate() {
        let ts = make_series(vec![1.0; 20]);
        let result = cross_validate(&CVConfig::default(), &ts, || -> Result<LastValue> {
            Err(ForecastError::InvalidConfig("bad".into()))
        });
        assert!(matches!(result, Err(ForecastError::InvalidConfig(_))));
    }
}
