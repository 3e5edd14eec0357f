//! Grid search over SARIMA configurations.

use super::options::{SelectionCriterion, SelectionOptions};
use crate::core::TimeSeries;
use crate::detection::{detect_seasonal_periods, SeasonalityConfig};
use crate::error::{ForecastError, Result};
use crate::models::arima::{ModelConfig, ModelOrder, SeasonalModel, SeasonalOrder};
use crate::models::Forecaster;
use crate::utils::cross_validation::AggregatedMetrics;
use crate::utils::metrics::{self, MetricValue};
use crate::validation::{
    seasonality_test, test_stationarity, ModelValidator, SeasonalityTest, StationarityReport,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info, info_span};

/// Scores of one candidate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub config: ModelConfig,
    pub aic: f64,
    pub bic: f64,
    pub aicc: MetricValue,
    pub hqic: f64,
    pub fpe: MetricValue,
    /// In-sample one-step errors.
    pub rmse: f64,
    pub mae: f64,
    pub mape: MetricValue,
    /// Kruskal-Wallis test of the data at the primary period.
    pub seasonality_test: Option<SeasonalityTest>,
    /// ADF and KPSS tests of the data.
    pub stationarity_test: StationarityReport,
    /// Fold-aggregated metrics, present for the cross-validation criterion.
    pub cross_validation: Option<AggregatedMetrics>,
}

impl ModelEvaluation {
    /// Ranking score under `criterion`; undefined scores rank last.
    pub fn score(&self, criterion: SelectionCriterion) -> f64 {
        let raw = match criterion {
            SelectionCriterion::Aic => self.aic,
            SelectionCriterion::Bic => self.bic,
            SelectionCriterion::Aicc => self.aicc.sort_key(),
            SelectionCriterion::Hqic => self.hqic,
            SelectionCriterion::CrossValidation => self
                .cross_validation
                .as_ref()
                .map_or(f64::INFINITY, |cv| cv.rmse),
        };
        if raw.is_nan() {
            f64::INFINITY
        } else {
            raw
        }
    }
}

/// Outcome of a search.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Best configuration refit on the full series.
    pub model: SeasonalModel,
    /// Successful evaluations, best first.
    pub evaluations: Vec<ModelEvaluation>,
    /// Seasonal periods searched.
    pub periods: Vec<usize>,
    /// Candidates that failed to fit and were dropped.
    pub failed: usize,
}

impl SelectionResult {
    /// Evaluation of the selected model.
    pub fn best(&self) -> &ModelEvaluation {
        &self.evaluations[0]
    }
}

/// Automatic SARIMA order selection.
///
/// # Example
/// ```
/// use sarimax_forecast::core::TimeSeries;
/// use sarimax_forecast::selection::{ModelSelection, SelectionOptions};
/// use chrono::{Duration, TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let values: Vec<f64> = (0..60).map(|t| 10.0 + ((t * 37) % 11) as f64 / 10.0).collect();
/// let timestamps = (0..60).map(|i| start + Duration::days(i)).collect();
/// let series = TimeSeries::univariate(timestamps, values).unwrap();
///
/// let options = SelectionOptions::default()
///     .with_max_order(1, 0)
///     .with_periods(vec![])
///     .with_non_seasonal(true);
/// let result = ModelSelection::new(options).unwrap().find_best_model(&series).unwrap();
/// assert_eq!(result.evaluations.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct ModelSelection {
    options: SelectionOptions,
}

impl ModelSelection {
    /// # Errors
    /// `InvalidConfig` for malformed options.
    pub fn new(options: SelectionOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &SelectionOptions {
        &self.options
    }

    /// Search the grid and return the best model refit on `series`.
    ///
    /// Candidates that fail to fit are dropped.
    ///
    /// # Errors
    /// `EmptyData` or `InvalidArgument` for unusable input;
    /// `NoViableModel` when every candidate fails.
    pub fn find_best_model(&self, series: &TimeSeries) -> Result<SelectionResult> {
        if series.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if series.has_missing_values() {
            return Err(ForecastError::InvalidArgument(
                "series contains missing values; preprocess it first".to_string(),
            ));
        }
        let values = series.values();
        let periods = self.seasonal_periods(values)?;
        let candidates = candidate_configs(&periods, &self.options);

        let span = info_span!(
            "model_selection",
            n = values.len(),
            candidates = candidates.len(),
            criterion = ?self.options.criterion
        );
        let _guard = span.enter();

        let data_tests = DataTests {
            seasonality: periods.first().and_then(|&m| seasonality_test(values, m).ok()),
            stationarity: test_stationarity(values),
        };

        let mut evaluations = Vec::with_capacity(candidates.len());
        let mut failed = 0;
        for batch in candidates.chunks(self.options.batch_size) {
            let outcomes: Vec<Result<ModelEvaluation>> = if self.options.parallel {
                batch
                    .par_iter()
                    .map(|config| self.evaluate(config, series, &data_tests))
                    .collect()
            } else {
                batch
                    .iter()
                    .map(|config| self.evaluate(config, series, &data_tests))
                    .collect()
            };

            for (config, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(evaluation) => evaluations.push(evaluation),
                    Err(e) => {
                        debug!(model = %config, error = %e, "candidate dropped");
                        failed += 1;
                    }
                }
            }
        }

        if evaluations.is_empty() {
            return Err(ForecastError::NoViableModel {
                evaluated: candidates.len(),
                failed,
            });
        }

        let criterion = self.options.criterion;
        evaluations.sort_by(|a, b| rank(a, b, criterion));

        let best = &evaluations[0];
        let mut model = SeasonalModel::new(best.config.clone())?;
        model.fit(series)?;

        info!(
            model = %best.config,
            score = best.score(criterion),
            evaluated = candidates.len(),
            failed,
            "selected model"
        );

        Ok(SelectionResult {
            model,
            evaluations,
            periods,
            failed,
        })
    }

    fn seasonal_periods(&self, values: &[f64]) -> Result<Vec<usize>> {
        if let Some(periods) = &self.options.periods {
            return Ok(periods.clone());
        }
        let config = SeasonalityConfig::default().with_max_periods(self.options.max_periods);
        let detected: Vec<usize> = detect_seasonal_periods(values, &config)?
            .into_iter()
            .map(|d| d.period)
            .collect();
        debug!(periods = ?detected, "detected seasonal periods");
        Ok(detected)
    }

    fn evaluate(
        &self,
        config: &ModelConfig,
        series: &TimeSeries,
        data_tests: &DataTests,
    ) -> Result<ModelEvaluation> {
        let mut model = SeasonalModel::new(config.clone())?;
        model.fit(series)?;
        let diagnostics = model.diagnostics()?;

        let fitted = model.fitted_values().ok_or(ForecastError::ModelNotFitted)?;
        let values = series.values();
        let actual = &values[values.len() - fitted.len()..];

        let cross_validation = match self.options.criterion {
            SelectionCriterion::CrossValidation => Some(
                ModelValidator
                    .cross_validate(&model, series, &self.options.cv)?
                    .aggregated,
            ),
            _ => None,
        };

        Ok(ModelEvaluation {
            config: config.clone(),
            aic: diagnostics.aic,
            bic: diagnostics.bic,
            aicc: diagnostics.aicc,
            hqic: diagnostics.hqic,
            fpe: diagnostics.fpe,
            rmse: metrics::rmse(actual, fitted),
            mae: metrics::mae(actual, fitted),
            mape: metrics::mape(actual, fitted),
            seasonality_test: data_tests.seasonality,
            stationarity_test: data_tests.stationarity.clone(),
            cross_validation,
        })
    }
}

/// Properties of the data shared by every candidate.
struct DataTests {
    seasonality: Option<SeasonalityTest>,
    stationarity: StationarityReport,
}

/// Ascending score, then fewer parameters, then the model label.
fn rank(a: &ModelEvaluation, b: &ModelEvaluation, criterion: SelectionCriterion) -> Ordering {
    a.score(criterion)
        .total_cmp(&b.score(criterion))
        .then_with(|| a.config.num_parameters().cmp(&b.config.num_parameters()))
        .then_with(|| a.config.to_string().cmp(&b.config.to_string()))
}

/// Every configuration of the search grid.
///
/// Seasonal components whose orders are all zero are left out, so a period
/// contributes either a non-trivial component or nothing. Configurations
/// without any seasonal component are kept only when no period is searched
/// or `include_non_seasonal` is set.
pub fn candidate_configs(periods: &[usize], options: &SelectionOptions) -> Vec<ModelConfig> {
    let mut seasonal_sets: Vec<Vec<SeasonalOrder>> = vec![Vec::new()];
    for &period in periods {
        let mut next = Vec::new();
        for set in &seasonal_sets {
            for sp in 0..=options.max_seasonal_order {
                for sd in 0..=options.max_seasonal_d {
                    for sq in 0..=options.max_seasonal_order {
                        let mut extended = set.clone();
                        let component = SeasonalOrder {
                            order: ModelOrder::new(sp, sd, sq),
                            period,
                        };
                        if !component.is_trivial() {
                            extended.push(component);
                        }
                        next.push(extended);
                    }
                }
            }
        }
        seasonal_sets = next;
    }
    if !periods.is_empty() && !options.include_non_seasonal {
        seasonal_sets.retain(|set| !set.is_empty());
    }

    let mut configs = Vec::new();
    for p in 0..=options.max_order {
        for d in 0..=options.max_d {
            for q in 0..=options.max_order {
                for set in &seasonal_sets {
                    configs.push(ModelConfig {
                        order: ModelOrder::new(p, d, q),
                        seasonal_orders: set.clone(),
                        tolerance: options.tolerance,
                        max_iterations: options.max_iterations,
                    });
                }
            }
        }
    }
    configs
}
