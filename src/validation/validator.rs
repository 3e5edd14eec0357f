//! Out-of-sample validation and residual diagnostics for seasonal models.

use crate::core::TimeSeries;
use crate::detection::{detect_outliers, OutlierConfig};
use crate::error::{ForecastError, Result};
use crate::models::arima::SeasonalModel;
use crate::utils::cross_validation::{cross_validate, CVConfig, CVResults};
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};
use crate::validation::residual_tests::{
    breusch_pagan, durbin_watson, jarque_bera, ljung_box, white_test, DurbinWatsonResult,
    LjungBoxResult, TestResult,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Residuals beyond this many standard deviations are reported as outliers.
const OUTLIER_Z: f64 = 3.0;

/// A residual flagged by the z-score rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualOutlier {
    pub index: usize,
    pub residual: f64,
    /// Observation at `index`.
    pub value: f64,
    pub z_score: f64,
}

/// Residual diagnostics of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualReport {
    /// Jarque-Bera.
    pub normality: TestResult,
    /// Ljung-Box.
    pub autocorrelation: LjungBoxResult,
    /// Breusch-Pagan against the predictions. `None` when the auxiliary
    /// regression is singular, for instance with constant predictions.
    pub breusch_pagan: Option<TestResult>,
    /// White against the predictions and their squares.
    pub white: Option<TestResult>,
    pub durbin_watson: DurbinWatsonResult,
    pub outliers: Vec<ResidualOutlier>,
}

impl ResidualReport {
    /// Whether either heteroskedasticity test rejects at `alpha`.
    pub fn is_heteroskedastic(&self, alpha: f64) -> bool {
        self.breusch_pagan.is_some_and(|t| t.rejects(alpha))
            || self.white.is_some_and(|t| t.rejects(alpha))
    }
}

/// Stateless validator for seasonal models.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelValidator;

impl ModelValidator {
    pub fn new() -> Self {
        Self
    }

    /// Cross-validate the configuration of `template` on `data`.
    ///
    /// Every fold fits a new model built from the template's configuration;
    /// the template's own fitted state, if any, is never used.
    pub fn cross_validate(
        &self,
        template: &SeasonalModel,
        data: &TimeSeries,
        config: &CVConfig,
    ) -> Result<CVResults> {
        config.validate()?;
        let model_config = template.config().clone();
        let results = cross_validate(config, data, || SeasonalModel::new(model_config.clone()))?;
        debug!(
            model = %model_config,
            folds = results.n_folds,
            rmse = results.aggregated.rmse,
            "cross-validated model"
        );
        Ok(results)
    }

    /// Accuracy of `predicted` against `actual`.
    ///
    /// `train_data` scales MASE and anchors Theil's U; `num_parameters` enters
    /// adjusted R².
    pub fn calculate_metrics(
        &self,
        actual: &[f64],
        predicted: &[f64],
        train_data: &[f64],
        num_parameters: usize,
    ) -> Result<AccuracyMetrics> {
        calculate_metrics(actual, predicted, train_data, num_parameters)
    }

    /// Normality, autocorrelation, heteroskedasticity and outlier checks.
    ///
    /// `residuals`, `predictions` and `data` must be aligned.
    ///
    /// # Errors
    /// `EmptyData` for no residuals, `DimensionMismatch` for misaligned inputs.
    pub fn validate_residuals(
        &self,
        residuals: &[f64],
        predictions: &[f64],
        data: &[f64],
    ) -> Result<ResidualReport> {
        if residuals.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        for other in [predictions.len(), data.len()] {
            if other != residuals.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: residuals.len(),
                    got: other,
                });
            }
        }

        let predictors = vec![predictions.to_vec()];
        let breusch_pagan = heteroskedasticity("breusch-pagan", breusch_pagan(residuals, &predictors));
        let white = heteroskedasticity("white", white_test(residuals, &predictors));

        let outlier_scan = detect_outliers(residuals, &OutlierConfig::z_score(OUTLIER_Z));
        let outliers = outlier_scan
            .outlier_indices
            .iter()
            .map(|&index| ResidualOutlier {
                index,
                residual: residuals[index],
                value: data[index],
                z_score: outlier_scan.scores[index],
            })
            .collect();

        Ok(ResidualReport {
            normality: jarque_bera(residuals),
            autocorrelation: ljung_box(residuals, None, 0),
            breusch_pagan,
            white,
            durbin_watson: durbin_watson(residuals),
            outliers,
        })
    }
}

fn heteroskedasticity(test: &str, result: Result<TestResult>) -> Option<TestResult> {
    match result {
        Ok(t) => Some(t),
        Err(e) => {
            debug!(test, error = %e, "heteroskedasticity test skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arima::{ModelConfig, ModelOrder};
    use chrono::{Duration, TimeZone, Utc};

    fn noise(t: usize) -> f64 {
        ((t as f64 * 12.9898).sin() * 43_758.545_3).fract() - 0.5
    }

    fn series(values: Vec<f64>) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..values.len()).map(|i| base + Duration::days(i as i64)).collect();
        TimeSeries::univariate(timestamps, values).unwrap()
    }

    #[test]
    fn cross_validation_ignores_template_state() {
        let values: Vec<f64> = (0..80).map(|t| 20.0 + noise(t)).collect();
        let data = series(values.clone());
        let config = ModelConfig::new(ModelOrder::new(1, 0, 0));

        let unfitted = SeasonalModel::new(config.clone()).unwrap();
        let mut fitted = SeasonalModel::new(config).unwrap();
        fitted.fit_values(&values.iter().map(|v| v * 100.0).collect::<Vec<_>>()).unwrap();

        let cv = CVConfig::rolling(40, 3).with_folds(4);
        let validator = ModelValidator::new();
        let a = validator.cross_validate(&unfitted, &data, &cv).unwrap();
        let b = validator.cross_validate(&fitted, &data, &cv).unwrap();

        assert_eq!(a.n_folds, 4);
        assert_eq!(a.aggregated, b.aggregated);
        assert!(a.aggregated.rmse < 1.5);
    }

    #[test]
    fn invalid_cv_config_is_rejected() {
        let data = series((0..30).map(|t| t as f64).collect());
        let template = SeasonalModel::new(ModelConfig::default()).unwrap();
        let result = ModelValidator.cross_validate(&template, &data, &CVConfig::k_fold(1, 1));
        assert!(matches!(result, Err(ForecastError::InvalidConfig(_))));
    }

    #[test]
    fn metrics_flag_zero_actuals() {
        let m = ModelValidator
            .calculate_metrics(&[0.0, 2.0], &[1.0, 2.0], &[1.0, 1.0], 0)
            .unwrap();
        assert!(!m.mape.is_defined());
        assert_eq!(m.mae, 0.5);
    }

    #[test]
    fn residual_report_flags_outlier() {
        let n = 100;
        let mut residuals: Vec<f64> = (0..n).map(noise).collect();
        residuals[42] = 8.0;
        let predictions: Vec<f64> = (0..n).map(|t| 10.0 + (t % 5) as f64).collect();
        let data: Vec<f64> = predictions.iter().zip(&residuals).map(|(p, r)| p + r).collect();

        let report = ModelValidator
            .validate_residuals(&residuals, &predictions, &data)
            .unwrap();
        assert_eq!(report.outliers.len(), 1);
        assert_eq!(report.outliers[0].index, 42);
        assert_eq!(report.outliers[0].value, data[42]);
        assert!(report.outliers[0].z_score > 3.0);
        assert!(report.normality.rejects(0.05));
        assert!(report.breusch_pagan.is_some());
        assert!(report.white.is_some());
    }

    #[test]
    fn heteroskedastic_residuals_are_detected() {
        let n = 200;
        let predictions: Vec<f64> = (0..n).map(|t| 1.0 + t as f64 / 20.0).collect();
        let residuals: Vec<f64> = (0..n)
            .map(|t| predictions[t] * if t % 2 == 0 { 1.0 } else { -1.0 } * (0.5 + noise(t).abs()))
            .collect();
        let report = ModelValidator
            .validate_residuals(&residuals, &predictions, &predictions)
            .unwrap();
        assert!(report.is_heteroskedastic(0.01));
    }

    #[test]
    fn constant_predictions_skip_heteroskedasticity() {
        let residuals: Vec<f64> = (0..30).map(noise).collect();
        let report = ModelValidator
            .validate_residuals(&residuals, &[5.0; 30], &[5.0; 30])
            .unwrap();
        assert!(report.breusch_pagan.is_none());
        assert!(!report.is_heteroskedastic(0.05));
    }

    #[test]
    fn misaligned_inputs() {
        assert!(matches!(
            ModelValidator.validate_residuals(&[1.0, 2.0], &[1.0], &[1.0, 2.0]),
            Err(ForecastError::DimensionMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            ModelValidator.validate_residuals(&[], &[], &[]),
            Err(ForecastError::EmptyData)
        ));
    }
}
