//! Time series container and the point type it is built from.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single observation with optional exogenous regressor values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exogenous: Option<HashMap<String, f64>>,
}

impl TimeSeriesPoint {
    /// Create a point without exogenous values.
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            exogenous: None,
        }
    }

    /// Attach an exogenous regressor value.
    pub fn with_exogenous(mut self, name: impl Into<String>, value: f64) -> Self {
        self.exogenous
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value);
        self
    }
}

/// A univariate time series with optional exogenous regressors.
///
/// Regressors are stored column-wise, one vector per name, aligned with the
/// observations.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    regressors: HashMap<String, Vec<f64>>,
}

impl TimeSeries {
    /// Create a univariate time series.
    ///
    /// # Errors
    /// - `DimensionMismatch` if timestamps and values differ in length
    /// - `TimestampError` if timestamps are not strictly increasing
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }

        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self {
            timestamps,
            values,
            regressors: HashMap::new(),
        })
    }

    /// Build a series from points.
    ///
    /// Every exogenous name seen on any point becomes a regressor column;
    /// points that lack it contribute `NaN` (fill with [`interpolated`](Self::interpolated)).
    pub fn from_points(points: &[TimeSeriesPoint]) -> Result<Self> {
        let timestamps = points.iter().map(|p| p.timestamp).collect();
        let values = points.iter().map(|p| p.value).collect();
        let mut series = Self::univariate(timestamps, values)?;

        let mut names: Vec<&String> = points
            .iter()
            .filter_map(|p| p.exogenous.as_ref())
            .flat_map(|m| m.keys())
            .collect();
        names.sort();
        names.dedup();

        for name in names {
            let column = points
                .iter()
                .map(|p| {
                    p.exogenous
                        .as_ref()
                        .and_then(|m| m.get(name))
                        .copied()
                        .unwrap_or(f64::NAN)
                })
                .collect();
            series.regressors.insert(name.clone(), column);
        }

        Ok(series)
    }

    /// Attach a named regressor column.
    pub fn with_regressor(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.len(),
                got: values.len(),
            });
        }
        self.regressors.insert(name.into(), values);
        Ok(self)
    }

    /// Convert back into points.
    pub fn to_points(&self) -> Vec<TimeSeriesPoint> {
        (0..self.len())
            .map(|i| {
                let exogenous = if self.regressors.is_empty() {
                    None
                } else {
                    Some(
                        self.regressors
                            .iter()
                            .map(|(name, col)| (name.clone(), col[i]))
                            .collect(),
                    )
                };
                TimeSeriesPoint {
                    timestamp: self.timestamps[i],
                    value: self.values[i],
                    exogenous,
                }
            })
            .collect()
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get timestamps.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get the observed values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Timestamp of the last observation.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// All regressor columns.
    pub fn regressors(&self) -> &HashMap<String, Vec<f64>> {
        &self.regressors
    }

    /// Get regressor values by name.
    pub fn regressor(&self, name: &str) -> Option<&[f64]> {
        self.regressors.get(name).map(|v| v.as_slice())
    }

    /// Check if the series carries exogenous regressors.
    pub fn has_regressors(&self) -> bool {
        !self.regressors.is_empty()
    }

    /// Extract observations `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start > end {
            return Err(ForecastError::InvalidArgument(
                "start must be <= end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.len(),
                got: end,
            });
        }

        Ok(TimeSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            regressors: self
                .regressors
                .iter()
                .map(|(name, col)| (name.clone(), col[start..end].to_vec()))
                .collect(),
        })
    }

    /// Check if the series or any regressor has missing values (NaN or Inf).
    pub fn has_missing_values(&self) -> bool {
        let missing = |v: &f64| !v.is_finite();
        self.values.iter().any(missing)
            || self.regressors.values().any(|col| col.iter().any(missing))
    }

    /// Return a copy with linear interpolation for missing values.
    ///
    /// With `fill_edges`, leading and trailing gaps take the nearest
    /// observed value; otherwise they stay `NaN`.
    pub fn interpolated(&self, fill_edges: bool) -> TimeSeries {
        TimeSeries {
            timestamps: self.timestamps.clone(),
            values: interpolate_series(&self.values, fill_edges),
            regressors: self
                .regressors
                .iter()
                .map(|(name, col)| (name.clone(), interpolate_series(col, fill_edges)))
                .collect(),
        }
    }

    /// Replace the observed values, keeping timestamps and regressors.
    pub fn with_values(&self, values: Vec<f64>) -> Result<TimeSeries> {
        if values.len() != self.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.len(),
                got: values.len(),
            });
        }
        Ok(TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
            regressors: self.regressors.clone(),
        })
    }

    /// Infer the sampling interval as the modal timestamp spacing.
    ///
    /// `tolerance` is the minimum share of spacings that must agree with
    /// the mode.
    pub fn infer_frequency(&self, tolerance: f64) -> Result<Duration> {
        if self.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: self.len(),
            });
        }

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for w in self.timestamps.windows(2) {
            *counts.entry((w[1] - w[0]).num_seconds()).or_insert(0) += 1;
        }

        // Ties resolve to the shorter spacing
        let (modal_diff, modal_count) = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&diff, &count)| (diff, count))
            .ok_or_else(|| ForecastError::TimestampError("empty spacing data".to_string()))?;

        let modal_ratio = modal_count as f64 / (self.len() - 1) as f64;
        if modal_ratio < tolerance {
            return Err(ForecastError::TimestampError(
                "no unique modal spacing found".to_string(),
            ));
        }

        Ok(Duration::seconds(modal_diff))
    }
}

/// Linear interpolation of non-finite values.
pub fn interpolate_series(values: &[f64], fill_edges: bool) -> Vec<f64> {
    let mut result = values.to_vec();
    let n = result.len();

    let mut i = 0;
    while i < n {
        if result[i].is_finite() {
            i += 1;
            continue;
        }

        let start = i;
        while i < n && !result[i].is_finite() {
            i += 1;
        }
        let end = i;

        let left = if start > 0 { Some(result[start - 1]) } else { None };
        let right = if end < n { Some(result[end]) } else { None };

        match (left, right) {
            (Some(l), Some(r)) => {
                // Gap spans (end - start + 1) segments between the boundaries
                let segments = (end - start + 1) as f64;
                for (j, idx) in (start..end).enumerate() {
                    let t = (j + 1) as f64 / segments;
                    result[idx] = l + t * (r - l);
                }
            }
            (Some(l), None) if fill_edges => result[start..end].fill(l),
            (None, Some(r)) if fill_edges => result[start..end].fill(r),
            _ => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::days(i as i64)).collect()
    }

    #[test]
    fn univariate_validates_lengths_and_order() {
        let ts = make_timestamps(3);
        assert!(matches!(
            TimeSeries::univariate(ts.clone(), vec![1.0, 2.0]),
            Err(ForecastError::DimensionMismatch { .. })
        ));

        let mut shuffled = ts.clone();
        shuffled.swap(0, 1);
        assert!(matches!(
            TimeSeries::univariate(shuffled, vec![1.0, 2.0, 3.0]),
            Err(ForecastError::TimestampError(_))
        ));

        let duplicate = vec![ts[0], ts[0], ts[1]];
        assert!(TimeSeries::univariate(duplicate, vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn from_points_collects_regressor_columns() {
        let ts = make_timestamps(3);
        let points = vec![
            TimeSeriesPoint::new(ts[0], 1.0).with_exogenous("price", 9.5),
            TimeSeriesPoint::new(ts[1], 2.0)
                .with_exogenous("price", 9.0)
                .with_exogenous("promo", 1.0),
            TimeSeriesPoint::new(ts[2], 3.0).with_exogenous("price", 8.5),
        ];

        let series = TimeSeries::from_points(&points).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(series.regressor("price").unwrap(), &[9.5, 9.0, 8.5]);

        let promo = series.regressor("promo").unwrap();
        assert!(promo[0].is_nan());
        assert_eq!(promo[1], 1.0);
        assert!(series.has_missing_values());
    }

    #[test]
    fn to_points_round_trip() {
        let series = TimeSeries::univariate(make_timestamps(2), vec![4.0, 5.0])
            .unwrap()
            .with_regressor("x", vec![0.1, 0.2])
            .unwrap();
        let rebuilt = TimeSeries::from_points(&series.to_points()).unwrap();
        assert_eq!(rebuilt, series);
    }

    #[test]
    fn slice_keeps_regressors_aligned() {
        let series = TimeSeries::univariate(make_timestamps(5), vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap()
            .with_regressor("x", vec![10.0, 20.0, 30.0, 40.0, 50.0])
            .unwrap();

        let sliced = series.slice(1, 4).unwrap();
        assert_eq!(sliced.values(), &[2.0, 3.0, 4.0]);
        assert_eq!(sliced.regressor("x").unwrap(), &[20.0, 30.0, 40.0]);
        assert_eq!(sliced.timestamps()[0], series.timestamps()[1]);

        assert!(series.slice(3, 2).is_err());
        assert!(series.slice(0, 6).is_err());
    }

    #[test]
    fn interpolation_fills_interior_gaps() {
        let values = vec![1.0, f64::NAN, f64::NAN, 4.0, f64::NAN];
        let series = TimeSeries::univariate(make_timestamps(5), values).unwrap();

        let filled = series.interpolated(false);
        assert_relative_eq!(filled.values()[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(filled.values()[2], 3.0, epsilon = 1e-12);
        assert!(filled.values()[4].is_nan());

        let filled_edges = series.interpolated(true);
        assert_relative_eq!(filled_edges.values()[4], 4.0, epsilon = 1e-12);
        assert!(!filled_edges.has_missing_values());
    }

    #[test]
    fn infer_frequency_uses_modal_spacing() {
        let mut ts = make_timestamps(10);
        // One irregular gap
        ts[9] = ts[8] + Duration::days(3);
        let series = TimeSeries::univariate(ts, vec![0.0; 10]).unwrap();

        assert_eq!(series.infer_frequency(0.8).unwrap(), Duration::days(1));
        assert!(series.infer_frequency(0.95).is_err());

        let single = TimeSeries::univariate(make_timestamps(1), vec![1.0]).unwrap();
        assert!(matches!(
            single.infer_frequency(0.5),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn point_serde_omits_missing_exogenous() {
        let point = TimeSeriesPoint::new(make_timestamps(1)[0], 3.5);
        let json = serde_json::to_string(&point).unwrap();
        assert!(!json.contains("exogenous"));

        let back: TimeSeriesPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, point);
    }
}
