//! Model lifecycle facade: initialize, train, forecast and evaluate.

use super::options::{ForecastOptions, PreprocessOptions, TrainOptions};
use super::store::{ModelStore, StoredModel};
use crate::core::{Forecast, ForecastResult, TimeSeries, TimeSeriesPoint};
use crate::detection::clip_outliers;
use crate::error::{ForecastError, Result};
use crate::models::arima::{ModelConfig, SeasonalModel};
use crate::models::Forecaster;
use crate::selection::{ModelEvaluation, ModelSelection};
use crate::transform::{scale, ScaleParams};
use crate::utils::metrics::{calculate_metrics, MetricValue};
use crate::validation::{LjungBoxResult, ModelValidator, TestResult};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, info_span, warn};

/// Share of timestamp spacings that must agree to infer a sampling interval.
const FREQUENCY_AGREEMENT: f64 = 0.5;

/// Observations after preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedData {
    pub series: TimeSeries,
    /// Missing target values filled by interpolation.
    pub interpolated: usize,
    /// Target values clipped as outliers.
    pub clipped: usize,
    /// Normalization applied to the target, if any.
    pub scaling: Option<ScaleParams>,
}

/// Summary of a training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model_id: String,
    /// Configuration that was fit, possibly chosen by selection.
    pub config: ModelConfig,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub iterations: usize,
    pub interpolated: usize,
    pub clipped: usize,
    /// Ranked candidates when selection ran; empty otherwise.
    pub evaluations: Vec<ModelEvaluation>,
}

/// Residual tests of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualTests {
    /// Jarque-Bera.
    pub normality: TestResult,
    /// Ljung-Box.
    pub autocorrelation: LjungBoxResult,
    /// Breusch-Pagan on the fitted values; `None` when the regression is singular.
    pub heteroskedasticity: Option<TestResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InformationCriteria {
    pub aic: f64,
    pub bic: f64,
    pub hqic: f64,
}

/// Accuracy of forecasts against realized values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    pub mape: MetricValue,
    pub rmse: f64,
    pub mae: f64,
    pub r2: MetricValue,
    pub theil_u: MetricValue,
}

/// Diagnostics of a stored model against realized values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub residual_tests: ResidualTests,
    pub information_criteria: InformationCriteria,
    pub forecast_accuracy: ForecastAccuracy,
}

/// Entry point for surrounding code. All state lives in the store.
///
/// # Example
/// ```
/// use sarimax_forecast::core::TimeSeriesPoint;
/// use sarimax_forecast::models::{ModelConfig, ModelOrder};
/// use sarimax_forecast::service::{
///     ForecastOptions, ForecastingService, InMemoryModelStore, TrainOptions,
/// };
/// use chrono::{Duration, TimeZone, Utc};
/// use std::collections::HashMap;
///
/// let service = ForecastingService::new(InMemoryModelStore::new());
/// let id = service
///     .initialize_model(ModelConfig::new(ModelOrder::new(1, 1, 0)), HashMap::new())
///     .unwrap();
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let points: Vec<_> = (0..30)
///     .map(|i| {
///         let value = 100.0 + i as f64 + ((i * 7) % 5) as f64;
///         TimeSeriesPoint::new(start + Duration::days(i), value)
///     })
///     .collect();
///
/// service.train_model(&id, &points, &TrainOptions::default()).unwrap();
/// let result = service.generate_forecast(&id, 3, &ForecastOptions::default()).unwrap();
/// assert_eq!(result.points.len(), 3);
/// assert_eq!(result.points[0].timestamp, start + Duration::days(30));
/// ```
#[derive(Debug, Clone)]
pub struct ForecastingService<S> {
    store: S,
}

impl<S: ModelStore> ForecastingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register an untrained model and return its id.
    ///
    /// # Errors
    /// `InvalidConfig` when the configuration is invalid.
    pub fn initialize_model(&self, config: ModelConfig, metadata: HashMap<String, String>) -> Result<String> {
        let _guard = info_span!("initialize_model", model = %config).entered();
        config.validate()?;
        let id = self.store.save_model(None, &StoredModel::new(config, metadata))?;
        info!(model_id = %id, "model initialized");
        Ok(id)
    }

    /// Preprocess `data`, fit the model (or select one) and persist the
    /// fitted state.
    pub fn train_model(
        &self,
        model_id: &str,
        data: &[TimeSeriesPoint],
        options: &TrainOptions,
    ) -> Result<TrainingReport> {
        let _guard = info_span!("train_model", model_id, n = data.len()).entered();
        options.validate()?;
        let mut stored = self.store.load_model(model_id)?;
        let prepared = self.preprocess_data(data, &options.preprocess)?;
        let series = &prepared.series;

        let (model, evaluations) = match &options.selection {
            Some(selection) => {
                let result = ModelSelection::new(selection.clone())?.find_best_model(series)?;
                (result.model, result.evaluations)
            }
            None => {
                let mut model = SeasonalModel::new(stored.config.clone())?;
                model.fit(series)?;
                (model, Vec::new())
            }
        };

        let diagnostics = model.diagnostics()?;
        let state = model.fitted_state().cloned().ok_or(ForecastError::ModelNotFitted)?;
        let iterations = state.iterations;

        stored.config = model.config().clone();
        stored.state = Some(state);
        stored.trained_at = Some(Utc::now());
        stored.last_observation = series.last_timestamp();
        stored.frequency_secs = series
            .infer_frequency(FREQUENCY_AGREEMENT)
            .ok()
            .map(|d| d.num_seconds());
        stored.normalization = prepared.scaling;
        self.store.save_model(Some(model_id), &stored)?;

        info!(
            model_id,
            model = %stored.config,
            aic = diagnostics.aic,
            iterations,
            "model trained"
        );

        Ok(TrainingReport {
            model_id: model_id.to_string(),
            config: stored.config,
            log_likelihood: diagnostics.log_likelihood,
            aic: diagnostics.aic,
            bic: diagnostics.bic,
            iterations,
            interpolated: prepared.interpolated,
            clipped: prepared.clipped,
            evaluations,
        })
    }

    /// Train on the most recent `limit` stored observations.
    pub fn train_from_history(
        &self,
        model_id: &str,
        limit: Option<usize>,
        options: &TrainOptions,
    ) -> Result<TrainingReport> {
        let points = self.store.get_historical_data(model_id, limit)?;
        self.train_model(model_id, &points, options)
    }

    /// Forecast `horizon` steps past the training data with prediction
    /// intervals, stamped at the training sampling interval.
    ///
    /// # Errors
    /// `ModelNotFitted` for an untrained model; `TimestampError` when the
    /// sampling interval is unknown and no step was given.
    pub fn generate_forecast(
        &self,
        model_id: &str,
        horizon: usize,
        options: &ForecastOptions,
    ) -> Result<ForecastResult> {
        let _guard = info_span!("generate_forecast", model_id, horizon).entered();
        options.validate()?;
        let stored = self.store.load_model(model_id)?;
        let model = restore(&stored)?;

        let forecast = model.predict_with_regressors(horizon, &options.future_regressors, Some(options.level))?;
        let forecast = denormalize(forecast, stored.normalization)?;

        let last = stored.last_observation.ok_or_else(|| {
            ForecastError::TimestampError("model has no training timestamps".to_string())
        })?;
        let step = options
            .step
            .or(stored.frequency_secs.map(Duration::seconds))
            .ok_or_else(|| {
                ForecastError::TimestampError(
                    "sampling interval unknown; supply a forecast step".to_string(),
                )
            })?;

        let points = forecast.to_points(last, step);
        if options.persist {
            self.store.save_forecast_results(model_id, &points)?;
        }
        info!(model_id, horizon, "forecast generated");

        Ok(ForecastResult {
            model_id: model_id.to_string(),
            generated_at: Utc::now(),
            points,
        })
    }

    /// Compare forecasts for the observations following the training data
    /// with `actual`, alongside residual tests and information criteria.
    pub fn analyze_forecast_accuracy(
        &self,
        model_id: &str,
        actual: &[TimeSeriesPoint],
    ) -> Result<DiagnosticResult> {
        let _guard = info_span!("analyze_forecast_accuracy", model_id, n = actual.len()).entered();
        if actual.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        let stored = self.store.load_model(model_id)?;
        let model = restore(&stored)?;
        let realized = TimeSeries::from_points(actual)?;

        let forecast = model.predict_with_regressors(realized.len(), realized.regressors(), None)?;
        let forecast = denormalize(forecast, stored.normalization)?;

        let history = training_values(&model, stored.normalization)?;
        let accuracy = calculate_metrics(
            realized.values(),
            forecast.primary(),
            &history,
            model.num_parameters(),
        )?;

        let residuals = model.residuals().ok_or(ForecastError::ModelNotFitted)?;
        let fitted = model.fitted_values().ok_or(ForecastError::ModelNotFitted)?;
        let observed: Vec<f64> = fitted.iter().zip(residuals).map(|(f, e)| f + e).collect();
        let report = ModelValidator.validate_residuals(residuals, fitted, &observed)?;
        let diagnostics = model.diagnostics()?;

        info!(model_id, rmse = accuracy.rmse, "forecast accuracy analyzed");

        Ok(DiagnosticResult {
            residual_tests: ResidualTests {
                normality: report.normality,
                autocorrelation: diagnostics.ljung_box,
                heteroskedasticity: report.breusch_pagan,
            },
            information_criteria: InformationCriteria {
                aic: diagnostics.aic,
                bic: diagnostics.bic,
                hqic: diagnostics.hqic,
            },
            forecast_accuracy: ForecastAccuracy {
                mape: accuracy.mape,
                rmse: accuracy.rmse,
                mae: accuracy.mae,
                r2: accuracy.r_squared,
                theil_u: accuracy.theil_u,
            },
        })
    }

    /// Interpolate missing values, clip outliers and normalize the target.
    ///
    /// # Errors
    /// `EmptyData` for no points; `InvalidArgument` when missing values
    /// remain; `TimestampError` for unordered timestamps.
    pub fn preprocess_data(&self, data: &[TimeSeriesPoint], options: &PreprocessOptions) -> Result<PreprocessedData> {
        options.validate()?;
        if data.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        let mut series = TimeSeries::from_points(data)?;

        let missing = series.values().iter().filter(|v| !v.is_finite()).count();
        let mut interpolated = 0;
        if options.interpolate && series.has_missing_values() {
            series = series.interpolated(true);
            interpolated = missing;
        }
        if series.has_missing_values() {
            return Err(ForecastError::InvalidArgument(
                "series contains missing values that could not be interpolated".to_string(),
            ));
        }

        let mut clipped = 0;
        if let Some(outliers) = &options.outliers {
            let (values, count) = clip_outliers(series.values(), outliers);
            if count > 0 {
                warn!(count, method = ?outliers.method, "clipped outliers");
                series = series.with_values(values)?;
            }
            clipped = count;
        }

        let scaling = match options.normalization {
            Some(method) => {
                let scaled = scale(series.values(), method);
                series = series.with_values(scaled.data)?;
                Some(scaled.params)
            }
            None => None,
        };

        Ok(PreprocessedData {
            series,
            interpolated,
            clipped,
            scaling,
        })
    }
}

fn restore(stored: &StoredModel) -> Result<SeasonalModel> {
    let state = stored.state.clone().ok_or(ForecastError::ModelNotFitted)?;
    SeasonalModel::from_state(stored.config.clone(), state)
}

/// Map a forecast of normalized values back to the original units.
fn denormalize(forecast: Forecast, scaling: Option<ScaleParams>) -> Result<Forecast> {
    let Some(params) = scaling else {
        return Ok(forecast);
    };
    let points = params.inverse(forecast.primary());
    match (forecast.lower(), forecast.upper(), forecast.level()) {
        (Some(lower), Some(upper), Some(level)) => Forecast::from_values_with_intervals(
            points,
            params.inverse(lower),
            params.inverse(upper),
            level,
        ),
        _ => Ok(Forecast::from_values(points)),
    }
}

/// Training observations in original units.
fn training_values(model: &SeasonalModel, scaling: Option<ScaleParams>) -> Result<Vec<f64>> {
    let state = model.fitted_state().ok_or(ForecastError::ModelNotFitted)?;
    let values: Vec<f64> = state
        .observations
        .iter()
        .enumerate()
        .map(|(i, x)| x + state.regression_fit.get(i).copied().unwrap_or(0.0))
        .collect();
    Ok(match scaling {
        Some(params) => params.inverse(&values),
        None => values,
    })
}
