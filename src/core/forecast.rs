//! Forecast containers: the numeric [`Forecast`] produced by models and the
//! timestamped [`ForecastPoint`]s handed to persistence.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Point predictions with optional prediction intervals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    point: Vec<f64>,
    lower: Option<Vec<f64>>,
    upper: Option<Vec<f64>>,
    level: Option<f64>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            ..Self::default()
        }
    }

    /// Create a forecast with prediction intervals at confidence `level`.
    pub fn from_values_with_intervals(
        values: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        level: f64,
    ) -> Result<Self> {
        if lower.len() != values.len() || upper.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: values.len(),
                got: lower.len().min(upper.len()),
            });
        }
        Ok(Self {
            point: values,
            lower: Some(lower),
            upper: Some(upper),
            level: Some(level),
        })
    }

    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    /// Check if forecast is empty.
    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Point predictions.
    pub fn primary(&self) -> &[f64] {
        &self.point
    }

    /// Mutable point predictions.
    pub fn primary_mut(&mut self) -> &mut Vec<f64> {
        &mut self.point
    }

    /// Lower interval bounds, if computed.
    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref()
    }

    /// Upper interval bounds, if computed.
    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    /// Confidence level of the intervals, if computed.
    pub fn level(&self) -> Option<f64> {
        self.level
    }

    /// Check if intervals are available.
    pub fn has_intervals(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    /// Shift every value (points and bounds) by `offset[i]`.
    pub fn shifted(mut self, offset: &[f64]) -> Result<Self> {
        if offset.len() != self.point.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.point.len(),
                got: offset.len(),
            });
        }
        let add = |v: &mut Vec<f64>| v.iter_mut().zip(offset).for_each(|(x, o)| *x += o);
        add(&mut self.point);
        if let Some(lower) = self.lower.as_mut() {
            add(lower);
        }
        if let Some(upper) = self.upper.as_mut() {
            add(upper);
        }
        Ok(self)
    }

    /// Stamp the forecast into points starting one `step` after `last_observed`.
    ///
    /// Without intervals, bounds equal the point value and confidence is 0.
    pub fn to_points(&self, last_observed: DateTime<Utc>, step: Duration) -> Vec<ForecastPoint> {
        let confidence = self.level.unwrap_or(0.0);
        self.point
            .iter()
            .enumerate()
            .map(|(i, &value)| ForecastPoint {
                timestamp: last_observed + step * (i as i32 + 1),
                value,
                lower_bound: self.lower.as_ref().map(|l| l[i]).unwrap_or(value),
                upper_bound: self.upper.as_ref().map(|u| u[i]).unwrap_or(value),
                confidence,
            })
            .collect()
    }
}

/// A timestamped forecast value with its interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
}

/// Forecast points produced for a stored model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub model_id: String,
    pub generated_at: DateTime<Utc>,
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    /// Point values in chronological order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn forecast_from_values() {
        let forecast = Forecast::from_values(vec![1.0, 2.0, 3.0, 4.0]);

        assert!(!forecast.is_empty());
        assert_eq!(forecast.horizon(), 4);
        assert_eq!(forecast.primary(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(!forecast.has_intervals());
        assert_eq!(forecast.level(), None);
    }

    #[test]
    fn forecast_with_intervals() {
        let forecast =
            Forecast::from_values_with_intervals(vec![2.0, 3.0], vec![1.0, 2.0], vec![3.0, 4.0], 0.95)
                .unwrap();

        assert_eq!(forecast.lower().unwrap(), &[1.0, 2.0]);
        assert_eq!(forecast.upper().unwrap(), &[3.0, 4.0]);
        assert_eq!(forecast.level(), Some(0.95));

        assert!(Forecast::from_values_with_intervals(vec![1.0], vec![], vec![2.0], 0.9).is_err());
    }

    #[test]
    fn shifted_moves_points_and_bounds() {
        let forecast =
            Forecast::from_values_with_intervals(vec![1.0, 1.0], vec![0.0, 0.0], vec![2.0, 2.0], 0.9)
                .unwrap()
                .shifted(&[10.0, 20.0])
                .unwrap();

        assert_eq!(forecast.primary(), &[11.0, 21.0]);
        assert_eq!(forecast.lower().unwrap(), &[10.0, 20.0]);
        assert_eq!(forecast.upper().unwrap(), &[12.0, 22.0]);
    }

    #[test]
    fn to_points_stamps_future_timestamps() {
        let last = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let forecast =
            Forecast::from_values_with_intervals(vec![5.0, 6.0], vec![4.0, 5.0], vec![6.0, 7.0], 0.8)
                .unwrap();

        let points = forecast.to_points(last, Duration::days(1));
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap());
        assert_eq!(points[1].timestamp, Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap());
        assert_eq!(points[1].lower_bound, 5.0);
        assert_eq!(points[1].confidence, 0.8);

        let bare = Forecast::from_values(vec![1.0]).to_points(last, Duration::hours(1));
        assert_eq!(bare[0].lower_bound, 1.0);
        assert_eq!(bare[0].upper_bound, 1.0);
    }
}
