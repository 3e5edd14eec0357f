//! Options of the forecasting service operations.

use crate::detection::OutlierConfig;
use crate::error::{ForecastError, Result};
use crate::selection::SelectionOptions;
use crate::transform::ScalingMethod;
use chrono::Duration;
use std::collections::HashMap;

/// Cleaning applied to raw observations before fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOptions {
    /// Linearly interpolate missing values; edges take the nearest value.
    pub interpolate: bool,
    /// Clip outliers to the fences of this detector.
    pub outliers: Option<OutlierConfig>,
    /// Rescale the target. Forecasts are mapped back automatically.
    pub normalization: Option<ScalingMethod>,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            interpolate: true,
            outliers: Some(OutlierConfig::default()),
            normalization: None,
        }
    }
}

impl PreprocessOptions {
    /// No cleaning at all.
    pub fn none() -> Self {
        Self {
            interpolate: false,
            outliers: None,
            normalization: None,
        }
    }

    pub fn with_interpolation(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }

    pub fn with_outliers(mut self, outliers: Option<OutlierConfig>) -> Self {
        self.outliers = outliers;
        self
    }

    pub fn with_normalization(mut self, method: ScalingMethod) -> Self {
        self.normalization = Some(method);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(outliers) = &self.outliers {
            if !(outliers.threshold.is_finite() && outliers.threshold > 0.0) {
                return Err(ForecastError::InvalidConfig(format!(
                    "outlier threshold must be positive, got {}",
                    outliers.threshold
                )));
            }
        }
        Ok(())
    }
}

/// Options of `train_model`.
#[derive(Debug, Clone, Default)]
pub struct TrainOptions {
    /// Search for the best configuration instead of fitting the stored one.
    pub selection: Option<SelectionOptions>,
    pub preprocess: PreprocessOptions,
}

impl TrainOptions {
    /// Run automatic model selection during training.
    pub fn with_selection(mut self, selection: SelectionOptions) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_preprocess(mut self, preprocess: PreprocessOptions) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.preprocess.validate()?;
        if let Some(selection) = &self.selection {
            selection.validate()?;
        }
        Ok(())
    }
}

/// Options of `generate_forecast`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOptions {
    /// Confidence level of the prediction intervals.
    pub level: f64,
    /// Future values of every regressor the model was trained with.
    pub future_regressors: HashMap<String, Vec<f64>>,
    /// Spacing of forecast timestamps; defaults to the training interval.
    pub step: Option<Duration>,
    /// Hand the points to the store.
    pub persist: bool,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            level: 0.95,
            future_regressors: HashMap::new(),
            step: None,
            persist: true,
        }
    }
}

impl ForecastOptions {
    pub fn with_level(mut self, level: f64) -> Self {
        self.level = level;
        self
    }

    /// Supply future values of a regressor.
    pub fn with_regressor(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.future_regressors.insert(name.into(), values);
        self
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.level > 0.0 && self.level < 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "confidence level must be in (0, 1), got {}",
                self.level
            )));
        }
        if self.step.is_some_and(|s| s <= Duration::zero()) {
            return Err(ForecastError::InvalidConfig(
                "forecast step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let preprocess = PreprocessOptions::default();
        assert!(preprocess.interpolate);
        assert_eq!(preprocess.outliers, Some(OutlierConfig::z_score(3.0)));
        assert!(preprocess.normalization.is_none());

        let forecast = ForecastOptions::default();
        assert_eq!(forecast.level, 0.95);
        assert!(forecast.persist);
        assert!(forecast.validate().is_ok());
        assert!(TrainOptions::default().validate().is_ok());
    }

    #[test]
    fn invalid_options() {
        assert!(ForecastOptions::default().with_level(1.0).validate().is_err());
        assert!(ForecastOptions::default()
            .with_step(Duration::seconds(-5))
            .validate()
            .is_err());
        let bad = PreprocessOptions::default().with_outliers(Some(OutlierConfig::iqr(0.0)));
        assert!(matches!(bad.validate(), Err(ForecastError::InvalidConfig(_))));
        let bad = TrainOptions::default().with_selection(SelectionOptions::default().with_batch_size(0));
        assert!(bad.validate().is_err());
    }
}
