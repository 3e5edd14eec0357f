//! Accuracy metrics for forecast evaluation.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// A metric that may be numerically undefined.
///
/// Division by a zero actual (MAPE), a constant target (R²) or a zero
/// benchmark error (Theil's U, MASE) yields `Undefined` instead of a
/// silent `NaN` or infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    /// A finite metric value.
    Defined(f64),
    /// The metric cannot be computed for this input.
    Undefined,
}

impl MetricValue {
    /// Wrap a raw value, mapping `NaN` and infinities to `Undefined`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Self::Defined(value)
        } else {
            Self::Undefined
        }
    }

    /// The value, if defined.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined => None,
        }
    }

    /// Whether the metric is defined.
    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }

    /// Ranking key where undefined values sort after every defined one.
    pub fn sort_key(&self) -> f64 {
        self.value().unwrap_or(f64::INFINITY)
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map(Self::from_f64).unwrap_or(Self::Undefined)
    }
}

/// Accuracy metrics for evaluating forecast performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, undefined if any actual is zero
    pub mape: MetricValue,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Mean Absolute Scaled Error against the in-sample naive forecast
    pub mase: MetricValue,
    /// R-squared (coefficient of determination)
    pub r_squared: MetricValue,
    /// R-squared adjusted for the number of model parameters
    pub adjusted_r_squared: MetricValue,
    /// Theil's U statistic against the no-change forecast
    pub theil_u: MetricValue,
    /// Durbin-Watson statistic of the forecast errors
    pub durbin_watson: MetricValue,
}

/// Calculate accuracy metrics between actual and predicted values.
///
/// # Arguments
/// * `actual` - Actual observed values
/// * `predicted` - Predicted/forecast values
/// * `train_data` - Training values preceding `actual`; scales MASE and
///   anchors the no-change benchmark of Theil's U
/// * `num_parameters` - Estimated parameter count used by adjusted R²
pub fn calculate_metrics(
    actual: &[f64],
    predicted: &[f64],
    train_data: &[f64],
    num_parameters: usize,
) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let mse = mse(actual, predicted);
    let r_squared = r_squared(actual, predicted);

    Ok(AccuracyMetrics {
        mae: mae(actual, predicted),
        mse,
        rmse: mse.sqrt(),
        mape: mape(actual, predicted),
        smape: smape(actual, predicted),
        mase: mase(actual, predicted, train_data),
        r_squared,
        adjusted_r_squared: adjusted_r_squared(r_squared, actual.len(), num_parameters),
        theil_u: theil_u(actual, predicted, train_data.last().copied()),
        durbin_watson: durbin_watson(&errors(actual, predicted)),
    })
}

fn errors(actual: &[f64], predicted: &[f64]) -> Vec<f64> {
    actual.iter().zip(predicted).map(|(a, p)| a - p).collect()
}

/// Calculate MAE between two slices.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Calculate MSE between two slices.
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

/// Calculate RMSE between two slices.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Mean absolute percentage error, `mean(|e / a|) * 100`.
///
/// Undefined when any actual value is zero.
pub fn mape(actual: &[f64], predicted: &[f64]) -> MetricValue {
    if actual.len() != predicted.len() || actual.is_empty() || actual.contains(&0.0) {
        return MetricValue::Undefined;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| ((a - p) / a).abs())
        .sum();
    MetricValue::from_f64(100.0 * sum / actual.len() as f64)
}

/// Calculate SMAPE between two slices.
pub fn smape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let n = actual.len() as f64;
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        })
        .sum::<f64>()
        * 100.0
        / n
}

/// Mean Absolute Scaled Error.
///
/// MASE = MAE / MAE_naive, where MAE_naive is the in-sample MAE of the
/// one-step naive forecast over `train_data`.
pub fn mase(actual: &[f64], predicted: &[f64], train_data: &[f64]) -> MetricValue {
    if train_data.len() < 2 {
        return MetricValue::Undefined;
    }

    let naive_mae: f64 = train_data
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .sum::<f64>()
        / (train_data.len() - 1) as f64;

    if naive_mae == 0.0 {
        return MetricValue::Undefined;
    }

    MetricValue::from_f64(mae(actual, predicted) / naive_mae)
}

/// Coefficient of determination. Undefined for a constant target.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> MetricValue {
    if actual.len() != predicted.len() || actual.is_empty() {
        return MetricValue::Undefined;
    }
    let n = actual.len() as f64;
    let mean_actual = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        MetricValue::Undefined
    } else {
        MetricValue::from_f64(1.0 - ss_res / ss_tot)
    }
}

/// Adjusted R², `1 - (1 - R²)(n - 1)/(n - p - 1)`.
///
/// Undefined when `n <= p + 1`.
pub fn adjusted_r_squared(r_squared: MetricValue, n: usize, num_parameters: usize) -> MetricValue {
    match r_squared {
        MetricValue::Defined(r2) if n > num_parameters + 1 => {
            let dof = (n - num_parameters - 1) as f64;
            MetricValue::from_f64(1.0 - (1.0 - r2) * (n - 1) as f64 / dof)
        }
        _ => MetricValue::Undefined,
    }
}

/// Theil's U against the no-change forecast.
///
/// `U = sqrt(Σ(p_t - a_t)²) / sqrt(Σ(a_t - a_{t-1})²)` where the value
/// preceding the first actual is `last_train` when given. U < 1 means the
/// forecast beats the naive benchmark.
pub fn theil_u(actual: &[f64], predicted: &[f64], last_train: Option<f64>) -> MetricValue {
    if actual.len() != predicted.len() || actual.is_empty() {
        return MetricValue::Undefined;
    }

    let mut model_ss = 0.0;
    let mut naive_ss = 0.0;
    let mut previous = last_train;

    for (a, p) in actual.iter().zip(predicted) {
        if let Some(prev) = previous {
            model_ss += (p - a).powi(2);
            naive_ss += (a - prev).powi(2);
        }
        previous = Some(*a);
    }

    if naive_ss == 0.0 {
        MetricValue::Undefined
    } else {
        MetricValue::from_f64((model_ss / naive_ss).sqrt())
    }
}

/// Durbin-Watson statistic, `Σ(e_t - e_{t-1})² / Σe_t²`.
///
/// Values near 2 indicate no first-order autocorrelation.
pub fn durbin_watson(residuals: &[f64]) -> MetricValue {
    if residuals.len() < 2 {
        return MetricValue::Undefined;
    }
    let ss: f64 = residuals.iter().map(|e| e * e).sum();
    if ss == 0.0 {
        return MetricValue::Undefined;
    }
    let diff_ss: f64 = residuals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    MetricValue::from_f64(diff_ss / ss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn calculate_metrics_perfect_prediction() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let predicted = vec![1.0, 2.0, 3.0, 4.0, 5.0];

        let metrics = calculate_metrics(&actual, &predicted, &[0.0, 0.5], 1).unwrap();

        assert_relative_eq!(metrics.mae, 0.0, epsilon = 1e-10);
        assert_relative_eq!(metrics.mse, 0.0, epsilon = 1e-10);
        assert_relative_eq!(metrics.rmse, 0.0, epsilon = 1e-10);
        assert_relative_eq!(metrics.smape, 0.0, epsilon = 1e-10);
        assert_eq!(metrics.r_squared, MetricValue::Defined(1.0));
        assert_eq!(metrics.theil_u, MetricValue::Defined(0.0));
        // Zero errors leave Durbin-Watson undefined
        assert_eq!(metrics.durbin_watson, MetricValue::Undefined);
    }

    #[test]
    fn calculate_metrics_known_values() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let predicted = vec![1.5, 2.5, 2.5, 4.5, 4.5];
        // Errors: -0.5, -0.5, 0.5, -0.5, 0.5

        let metrics = calculate_metrics(&actual, &predicted, &[], 0).unwrap();

        assert_relative_eq!(metrics.mae, 0.5, epsilon = 1e-10);
        assert_relative_eq!(metrics.mse, 0.25, epsilon = 1e-10);
        assert_relative_eq!(metrics.rmse, 0.5, epsilon = 1e-10);
        // R² = 1 - 1.25 / 10
        assert_relative_eq!(metrics.r_squared.value().unwrap(), 0.875, epsilon = 1e-10);
        // Differences of errors: 0, 1, -1, 1 -> 3 / 1.25
        assert_relative_eq!(metrics.durbin_watson.value().unwrap(), 2.4, epsilon = 1e-10);
    }

    #[test]
    fn adjusted_r_squared_penalizes_parameters() {
        let r2 = MetricValue::Defined(0.9);
        let adj = adjusted_r_squared(r2, 11, 2).value().unwrap();
        // 1 - 0.1 * 10 / 8
        assert_relative_eq!(adj, 0.875, epsilon = 1e-12);

        assert_eq!(adjusted_r_squared(r2, 3, 2), MetricValue::Undefined);
        assert_eq!(
            adjusted_r_squared(MetricValue::Undefined, 20, 1),
            MetricValue::Undefined
        );
    }

    #[test]
    fn mape_with_zero_actual_is_undefined() {
        let actual = vec![0.0, 1.0, 2.0];
        let predicted = vec![0.1, 1.1, 2.1];

        let metrics = calculate_metrics(&actual, &predicted, &[], 0).unwrap();

        assert_eq!(metrics.mape, MetricValue::Undefined);
        assert!(metrics.smape.is_finite());
    }

    #[test]
    fn mape_known_value() {
        let m = mape(&[100.0, 200.0], &[110.0, 180.0]).value().unwrap();
        assert_relative_eq!(m, 10.0, epsilon = 1e-10);
    }

    #[test]
    fn r_squared_undefined_for_constant_target() {
        assert_eq!(r_squared(&[3.0, 3.0, 3.0], &[2.0, 3.0, 4.0]), MetricValue::Undefined);
    }

    #[test]
    fn theil_u_against_naive() {
        // Naive from last train 10: errors 2, -1 -> SS 5; model errors 1, 1 -> SS 2
        let u = theil_u(&[12.0, 11.0], &[13.0, 10.0], Some(10.0)).value().unwrap();
        assert_relative_eq!(u, (2.0_f64 / 5.0).sqrt(), epsilon = 1e-12);

        // Without a train anchor the first point only seeds the benchmark
        let u = theil_u(&[12.0, 11.0], &[13.0, 10.0], None).value().unwrap();
        assert_relative_eq!(u, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn mase_uses_training_naive_scale() {
        let train = vec![1.0, 3.0, 2.0, 4.0];
        // Naive in-sample MAE = (2 + 1 + 2) / 3
        let m = mase(&[5.0, 6.0], &[4.0, 7.0], &train).value().unwrap();
        assert_relative_eq!(m, 1.0 / (5.0 / 3.0), epsilon = 1e-12);

        assert_eq!(mase(&[1.0], &[1.0], &[2.0]), MetricValue::Undefined);
        assert_eq!(mase(&[1.0], &[1.0], &[2.0, 2.0]), MetricValue::Undefined);
    }

    #[test]
    fn durbin_watson_extremes() {
        // Alternating residuals -> strong negative autocorrelation -> near 4
        let alt: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(durbin_watson(&alt).value().unwrap() > 3.9);

        // Slowly varying residuals -> near 0
        let smooth: Vec<f64> = (0..100).map(|i| (i as f64 * 0.01).sin() + 1.0).collect();
        assert!(durbin_watson(&smooth).value().unwrap() < 0.1);
    }

    #[test]
    fn calculate_metrics_dimension_mismatch() {
        let result = calculate_metrics(&[1.0, 2.0, 3.0], &[1.0, 2.0], &[], 0);
        assert!(matches!(
            result,
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn calculate_metrics_empty_data() {
        let result = calculate_metrics(&[], &[], &[], 0);
        assert!(matches!(result, Err(ForecastError::EmptyData)));
    }

    #[test]
    fn metric_value_conversions() {
        assert_eq!(MetricValue::from_f64(f64::NAN), MetricValue::Undefined);
        assert_eq!(MetricValue::from_f64(f64::INFINITY), MetricValue::Undefined);
        assert_eq!(MetricValue::from(Some(1.5)), MetricValue::Defined(1.5));
        assert_eq!(MetricValue::Undefined.sort_key(), f64::INFINITY);
        assert!(MetricValue::Defined(2.0).is_defined());
    }
}
