//! Kruskal-Wallis rank test for seasonality.
//!
//! The series is detrended with the classical moving average, then the
//! detrended values are grouped by seasonal phase. Identical phase
//! distributions (the null) mean no seasonality.

use crate::error::{ForecastError, Result};
use crate::seasonality::seasonal_decompose_with_period;
use crate::utils::stats;
use serde::{Deserialize, Serialize};

/// Outcome of the seasonality test at one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityTest {
    /// Period tested.
    pub period: usize,
    /// Kruskal-Wallis H statistic, tie-corrected.
    pub statistic: f64,
    pub p_value: f64,
    /// `period - 1`.
    pub df: usize,
}

impl SeasonalityTest {
    /// Whether seasonality is significant at `alpha`.
    pub fn is_seasonal(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Test for seasonality at `period`.
///
/// # Errors
/// `InvalidArgument` for a period below 2; `InsufficientData` unless every
/// phase holds at least two observations.
pub fn seasonality_test(data: &[f64], period: usize) -> Result<SeasonalityTest> {
    if period < 2 {
        return Err(ForecastError::InvalidArgument(format!(
            "seasonal period must be >= 2, got {period}"
        )));
    }
    let needed = (2 * period).max(8);
    if data.len() < needed {
        return Err(ForecastError::InsufficientData {
            needed,
            got: data.len(),
        });
    }

    let detrended = seasonal_decompose_with_period(data, period)?.detrended();
    let statistic = kruskal_wallis(&detrended, period);
    let df = period - 1;

    Ok(SeasonalityTest {
        period,
        statistic,
        p_value: stats::chi_square_sf(statistic, df as f64),
        df,
    })
}

/// Tie-corrected Kruskal-Wallis H for groups formed by `t % period`.
fn kruskal_wallis(values: &[f64], period: usize) -> f64 {
    let n = values.len();
    let ranks = average_ranks(values);

    let mut rank_sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (t, r) in ranks.iter().enumerate() {
        rank_sums[t % period] += r;
        counts[t % period] += 1;
    }

    let n_f = n as f64;
    let h = 12.0 / (n_f * (n_f + 1.0))
        * rank_sums
            .iter()
            .zip(&counts)
            .map(|(r, &c)| r * r / c as f64)
            .sum::<f64>()
        - 3.0 * (n_f + 1.0);

    let ties = tie_sizes(values)
        .iter()
        .map(|&t| (t * t * t - t) as f64)
        .sum::<f64>();
    let correction = 1.0 - ties / (n_f * n_f * n_f - n_f);
    if correction <= 0.0 {
        return 0.0;
    }
    (h / correction).max(0.0)
}

/// 1-based ranks with ties sharing their average rank.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

fn tie_sizes(values: &[f64]) -> Vec<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut sizes = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        if j > i {
            sizes.push(j - i + 1);
        }
        i = j + 1;
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn noise(t: usize) -> f64 {
        ((t as f64 * 12.9898).sin() * 43_758.545_3).fract() - 0.5
    }

    #[test]
    fn detects_weekly_seasonality() {
        let data: Vec<f64> = (0..140)
            .map(|t| 100.0 + 10.0 * (2.0 * PI * (t % 7) as f64 / 7.0).sin() + noise(t))
            .collect();
        let result = seasonality_test(&data, 7).unwrap();
        assert_eq!(result.df, 6);
        assert!(result.is_seasonal(0.01), "p = {}", result.p_value);
    }

    #[test]
    fn noise_is_not_seasonal() {
        let data: Vec<f64> = (0..140).map(|t| 50.0 + noise(t)).collect();
        let seasonal: Vec<f64> = (0..140)
            .map(|t| 50.0 + 3.0 * (2.0 * PI * t as f64 / 7.0).sin() + noise(t))
            .collect();
        let plain = seasonality_test(&data, 7).unwrap();
        let strong = seasonality_test(&seasonal, 7).unwrap();
        assert!(plain.statistic < strong.statistic);
        assert!(plain.p_value > strong.p_value);
    }

    #[test]
    fn ranks_average_ties() {
        let ranks = average_ranks(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
        assert_eq!(tie_sizes(&[3.0, 1.0, 3.0, 2.0]), vec![2]);
    }

    #[test]
    fn h_statistic_textbook_value() {
        // Groups by phase: {1, 2, 3} vs {4, 5, 6} after interleaving
        let values = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        // Rank sums 6 and 15, n = 6: H = 12/42 * (36/3 + 225/3) - 21
        assert_relative_eq!(kruskal_wallis(&values, 2), 12.0 / 42.0 * 87.0 - 21.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(
            seasonality_test(&[1.0; 20], 1),
            Err(ForecastError::InvalidArgument(_))
        ));
        assert!(matches!(
            seasonality_test(&[1.0; 10], 7),
            Err(ForecastError::InsufficientData { needed: 14, got: 10 })
        ));
    }

    #[test]
    fn constant_series_has_zero_statistic() {
        let result = seasonality_test(&[4.0; 30], 3).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }
}
