//! Search space and ranking options for automatic model selection.

use crate::error::{ForecastError, Result};
use crate::models::arima::ModelConfig;
use crate::utils::cross_validation::CVConfig;
use serde::{Deserialize, Serialize};

/// Criterion candidates are ranked by. Lower is better for every criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionCriterion {
    #[default]
    Aic,
    Bic,
    /// Small-sample corrected AIC.
    Aicc,
    /// Hannan-Quinn.
    Hqic,
    /// Mean out-of-sample RMSE over the folds of [`SelectionOptions::cv`].
    CrossValidation,
}

/// Options for [`ModelSelection`](super::ModelSelection).
///
/// The grid is `p, q ∈ 0..=max_order`, `d ∈ 0..=max_d`, crossed with
/// `P, Q ∈ 0..=max_seasonal_order`, `D ∈ 0..=max_seasonal_d` for every
/// seasonal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionOptions {
    pub max_order: usize,
    pub max_d: usize,
    pub max_seasonal_order: usize,
    pub max_seasonal_d: usize,
    /// Seasonal periods to search. `None` detects them from the periodogram.
    pub periods: Option<Vec<usize>>,
    /// Most periods kept from detection.
    pub max_periods: usize,
    pub criterion: SelectionCriterion,
    /// Evaluate each batch on the rayon pool.
    pub parallel: bool,
    /// Candidates evaluated together.
    pub batch_size: usize,
    /// Also search models without seasonal components when periods exist.
    pub include_non_seasonal: bool,
    /// Folds for [`SelectionCriterion::CrossValidation`].
    pub cv: CVConfig,
    /// Tolerance and iteration budget given to every candidate.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        let model = ModelConfig::default();
        Self {
            max_order: 2,
            max_d: 2,
            max_seasonal_order: 1,
            max_seasonal_d: 1,
            periods: None,
            max_periods: 2,
            criterion: SelectionCriterion::Aic,
            parallel: false,
            batch_size: 4,
            include_non_seasonal: false,
            cv: CVConfig::default(),
            tolerance: model.tolerance,
            max_iterations: model.max_iterations,
        }
    }
}

impl SelectionOptions {
    /// Bound the non-seasonal orders.
    pub fn with_max_order(mut self, max_order: usize, max_d: usize) -> Self {
        self.max_order = max_order;
        self.max_d = max_d;
        self
    }

    /// Bound the seasonal orders.
    pub fn with_max_seasonal_order(mut self, max_order: usize, max_d: usize) -> Self {
        self.max_seasonal_order = max_order;
        self.max_seasonal_d = max_d;
        self
    }

    /// Search these periods instead of detecting them.
    pub fn with_periods(mut self, periods: Vec<usize>) -> Self {
        self.periods = Some(periods);
        self
    }

    pub fn with_max_periods(mut self, max_periods: usize) -> Self {
        self.max_periods = max_periods;
        self
    }

    pub fn with_criterion(mut self, criterion: SelectionCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Evaluate batches in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_non_seasonal(mut self, include: bool) -> Self {
        self.include_non_seasonal = include;
        self
    }

    /// Folds used by the cross-validation criterion.
    pub fn with_cv(mut self, cv: CVConfig) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Reject malformed option combinations.
    pub fn validate(&self) -> Result<()> {
        if self.max_d > 2 {
            return Err(ForecastError::InvalidConfig(format!(
                "max_d must be <= 2, got {}",
                self.max_d
            )));
        }
        if self.max_seasonal_d > 1 {
            return Err(ForecastError::InvalidConfig(format!(
                "max_seasonal_d must be <= 1, got {}",
                self.max_seasonal_d
            )));
        }
        if self.batch_size == 0 {
            return Err(ForecastError::InvalidConfig(
                "batch_size must be >= 1".to_string(),
            ));
        }
        if self.max_periods == 0 && self.periods.is_none() {
            return Err(ForecastError::InvalidConfig(
                "max_periods must be >= 1".to_string(),
            ));
        }
        if let Some(bad) = self.periods.iter().flatten().find(|&&m| m < 2) {
            return Err(ForecastError::InvalidConfig(format!(
                "seasonal periods must be >= 2, got {bad}"
            )));
        }
        if self.criterion == SelectionCriterion::CrossValidation {
            self.cv.validate()?;
        }
        // Tolerance and iteration budget share the model's rules.
        ModelConfig::default()
            .with_tolerance(self.tolerance)
            .with_max_iterations(self.max_iterations)
            .validate()
    }
}
