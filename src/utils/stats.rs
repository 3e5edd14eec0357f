//! Statistical utility functions.
//!
//! Distribution functions, special functions, descriptive statistics and
//! serial-correlation estimates. Every function here is pure and safe to call
//! from any thread.

use crate::error::{ForecastError, Result};
use std::f64::consts::{PI, SQRT_2};

const NEWTON_MAX_ITER: usize = 100;
const NEWTON_TOLERANCE: f64 = 1e-10;

/// Lanczos coefficients for g = 7, n = 9.
const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Approximate quantile function for standard normal distribution.
///
/// Uses the Abramowitz and Stegun approximation (formula 26.2.23). Accurate
/// to about 4.5e-4; [`normal_inverse_cdf`] refines it to full precision.
///
/// # Example
/// ```
/// use sarimax_forecast::utils::quantile_normal;
///
/// // 95% confidence level -> z ≈ 1.96
/// let z = quantile_normal(0.975);
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let t = if p < 0.5 {
        (-2.0 * p.ln()).sqrt()
    } else {
        (-2.0 * (1.0 - p).ln()).sqrt()
    };

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;
    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let result = t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t);

    if p < 0.5 {
        -result
    } else {
        result
    }
}

/// Error function.
pub fn erf(x: f64) -> f64 {
    1.0 - erfc(x)
}

/// Complementary error function (Chebyshev fit, fractional error < 1.2e-7).
pub fn erfc(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.5 * x.abs());
    let tau = t
        * (-x * x - 1.26551223
            + t * (1.00002368
                + t * (0.37409196
                    + t * (0.09678418
                        + t * (-0.18628806
                            + t * (0.27886807
                                + t * (-1.13520398
                                    + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277)))))))))
            .exp();

    if x >= 0.0 {
        tau
    } else {
        2.0 - tau
    }
}

/// Normal probability density.
pub fn normal_pdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    (-0.5 * z * z).exp() / (std_dev * (2.0 * PI).sqrt())
}

/// Normal cumulative distribution function.
pub fn normal_cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    0.5 * erfc(-(x - mean) / (std_dev * SQRT_2))
}

/// Inverse of the normal CDF.
///
/// Starts from the Abramowitz-Stegun approximation and refines with
/// Newton-Raphson (at most 100 iterations, step tolerance 1e-10).
///
/// # Errors
/// `InvalidArgument` when `p` is outside the open interval (0, 1) or
/// `std_dev` is not positive.
pub fn normal_inverse_cdf(p: f64, mean: f64, std_dev: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(ForecastError::InvalidArgument(format!(
            "probability must lie in (0, 1), got {p}"
        )));
    }
    if !(std_dev > 0.0) {
        return Err(ForecastError::InvalidArgument(format!(
            "standard deviation must be positive, got {std_dev}"
        )));
    }

    let mut z = quantile_normal(p);
    for _ in 0..NEWTON_MAX_ITER {
        let density = normal_pdf(z, 0.0, 1.0);
        if density < f64::MIN_POSITIVE {
            break;
        }
        let step = (normal_cdf(z, 0.0, 1.0) - p) / density;
        z -= step;
        if step.abs() < NEWTON_TOLERANCE {
            break;
        }
    }

    Ok(mean + std_dev * z)
}

/// Two-sided p-value of a standard normal statistic.
pub fn two_sided_normal_p_value(z: f64) -> f64 {
    if !z.is_finite() {
        return if z.is_nan() { f64::NAN } else { 0.0 };
    }
    (2.0 * (1.0 - normal_cdf(z.abs(), 0.0, 1.0))).clamp(0.0, 1.0)
}

/// Chi-square CDF via the Wilson-Hilferty cube-root transform to a normal.
pub fn chi_square_cdf(x: f64, df: f64) -> f64 {
    if x <= 0.0 || df <= 0.0 {
        return 0.0;
    }
    let h = 2.0 / (9.0 * df);
    let z = ((x / df).powf(1.0 / 3.0) - (1.0 - h)) / h.sqrt();
    normal_cdf(z, 0.0, 1.0)
}

/// Chi-square survival function, `1 - chi_square_cdf`.
pub fn chi_square_sf(x: f64, df: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    (1.0 - chi_square_cdf(x, df)).clamp(0.0, 1.0)
}

/// Inverse chi-square CDF, Newton-Raphson on [`chi_square_cdf`].
///
/// # Errors
/// `InvalidArgument` when `p` is outside (0, 1) or `df` is not positive.
pub fn chi_square_inverse_cdf(p: f64, df: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(ForecastError::InvalidArgument(format!(
            "probability must lie in (0, 1), got {p}"
        )));
    }
    if !(df > 0.0) {
        return Err(ForecastError::InvalidArgument(format!(
            "degrees of freedom must be positive, got {df}"
        )));
    }

    let h = 2.0 / (9.0 * df);
    let z = normal_inverse_cdf(p, 0.0, 1.0)?;
    let cube = (z * h.sqrt() + 1.0 - h).max(1e-6);
    let mut x = df * cube.powi(3);

    for _ in 0..NEWTON_MAX_ITER {
        let u = (x / df).powf(1.0 / 3.0);
        let zx = (u - (1.0 - h)) / h.sqrt();
        // d/dx of the transformed statistic
        let dz = u / (3.0 * x * h.sqrt());
        let density = normal_pdf(zx, 0.0, 1.0) * dz;
        if density < f64::MIN_POSITIVE {
            break;
        }
        let step = (chi_square_cdf(x, df) - p) / density;
        let mut next = x - step;
        if next <= 0.0 {
            next = x / 2.0;
        }
        let moved = (next - x).abs();
        x = next;
        if moved < NEWTON_TOLERANCE * x.max(1.0) {
            break;
        }
    }

    Ok(x)
}

/// Gamma function via the Lanczos approximation.
///
/// Uses the reflection formula for `z < 0.5`; poles at non-positive integers
/// evaluate to `NaN`.
pub fn gamma(z: f64) -> f64 {
    if z < 0.5 {
        let s = (PI * z).sin();
        if s == 0.0 {
            return f64::NAN;
        }
        return PI / (s * gamma(1.0 - z));
    }

    let z = z - 1.0;
    let mut x = LANCZOS_COEFFICIENTS[0];
    for (i, &c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        x += c / (z + i as f64);
    }
    let t = z + LANCZOS_G + 0.5;
    (2.0 * PI).sqrt() * t.powf(z + 0.5) * (-t).exp() * x
}

/// Natural log of |Γ(z)| via the Lanczos approximation.
pub fn log_gamma(z: f64) -> f64 {
    if z < 0.5 {
        let s = (PI * z).sin().abs();
        if s == 0.0 {
            return f64::INFINITY;
        }
        return (PI / s).ln() - log_gamma(1.0 - z);
    }

    let z = z - 1.0;
    let mut x = LANCZOS_COEFFICIENTS[0];
    for (i, &c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        x += c / (z + i as f64);
    }
    let t = z + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (z + 0.5) * t.ln() - t + x.ln()
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Population variance (n denominator).
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Calculate the standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Empirical quantile with linear interpolation between order statistics.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Sample skewness `m3 / m2^(3/2)` using population moments.
pub fn skewness(values: &[f64]) -> f64 {
    let (m2, m3, _) = central_moments(values);
    if m2 <= 0.0 || m2.is_nan() {
        return 0.0;
    }
    m3 / m2.powf(1.5)
}

/// Sample kurtosis `m4 / m2^2` (a normal distribution has kurtosis 3).
pub fn kurtosis(values: &[f64]) -> f64 {
    let (m2, _, m4) = central_moments(values);
    if m2 <= 0.0 || m2.is_nan() {
        return 3.0;
    }
    m4 / (m2 * m2)
}

/// Excess kurtosis, `kurtosis - 3`.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    kurtosis(values) - 3.0
}

fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let m = mean(values);
    let mut m2 = 0.0;
    let mut m3 = 0.0;
    let mut m4 = 0.0;
    for &x in values {
        let d = x - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Calculate the autocorrelation at a given lag.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if values.len() <= lag {
        return f64::NAN;
    }
    let m = mean(values);
    let n = values.len();

    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for i in 0..n {
        denominator += (values[i] - m).powi(2);
        if i >= lag {
            numerator += (values[i] - m) * (values[i - lag] - m);
        }
    }

    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Autocorrelation function for lags `0..=max_lag`.
///
/// Normalized autocovariance with the biased (n) denominator, so the
/// sequence is positive semi-definite. `max_lag` is capped at `n - 1`.
pub fn acf(data: &[f64], max_lag: usize) -> Vec<f64> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }
    let max_lag = max_lag.min(n - 1);
    let m = mean(data);
    let centered: Vec<f64> = data.iter().map(|x| x - m).collect();
    let c0: f64 = centered.iter().map(|x| x * x).sum();

    if c0 == 0.0 {
        let mut out = vec![0.0; max_lag + 1];
        out[0] = 1.0;
        return out;
    }

    (0..=max_lag)
        .map(|k| {
            centered
                .iter()
                .skip(k)
                .zip(centered.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / c0
        })
        .collect()
}

/// Partial autocorrelation function for lags `0..=max_lag` (Durbin-Levinson).
///
/// Index 0 is always 1.
pub fn pacf(data: &[f64], max_lag: usize) -> Vec<f64> {
    let rho = acf(data, max_lag);
    if rho.is_empty() {
        return Vec::new();
    }
    let max_lag = rho.len() - 1;

    let mut out = vec![0.0; max_lag + 1];
    out[0] = 1.0;
    if max_lag == 0 {
        return out;
    }

    let mut phi_prev: Vec<f64> = Vec::with_capacity(max_lag);
    for k in 1..=max_lag {
        let mut num = rho[k];
        let mut den = 1.0;
        for j in 1..k {
            num -= phi_prev[j - 1] * rho[k - j];
            den -= phi_prev[j - 1] * rho[j];
        }
        let phi_kk = if den.abs() < 1e-12 { 0.0 } else { num / den };

        let mut phi_curr = vec![0.0; k];
        for j in 1..k {
            phi_curr[j - 1] = phi_prev[j - 1] - phi_kk * phi_prev[k - j - 1];
        }
        phi_curr[k - 1] = phi_kk;

        out[k] = phi_kk;
        phi_prev = phi_curr;
    }

    out
}

/// Sample standard error of the mean, `sqrt(Σ(x - x̄)² / (k(k-1)))`.
///
/// Returns 0 for fewer than two values.
pub fn standard_error(values: &[f64]) -> f64 {
    let k = values.len();
    if k < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (k * (k - 1)) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quantile_normal_known_values() {
        assert_relative_eq!(quantile_normal(0.5), 0.0, epsilon = 0.01);
        assert_relative_eq!(quantile_normal(0.975), 1.96, epsilon = 0.01);
        assert_relative_eq!(quantile_normal(0.025), -1.96, epsilon = 0.01);
        assert_eq!(quantile_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(quantile_normal(1.0), f64::INFINITY);
    }

    #[test]
    fn normal_cdf_known_values() {
        assert_relative_eq!(normal_cdf(0.0, 0.0, 1.0), 0.5, epsilon = 1e-7);
        assert_relative_eq!(normal_cdf(1.959964, 0.0, 1.0), 0.975, epsilon = 1e-6);
        assert_relative_eq!(normal_cdf(12.0, 10.0, 2.0), 0.841345, epsilon = 1e-6);
    }

    #[test]
    fn normal_inverse_cdf_refines_to_high_precision() {
        let z = normal_inverse_cdf(0.975, 0.0, 1.0).unwrap();
        assert_relative_eq!(z, 1.959964, epsilon = 1e-5);

        let x = normal_inverse_cdf(0.5, 100.0, 15.0).unwrap();
        assert_relative_eq!(x, 100.0, epsilon = 1e-6);

        for &p in &[0.001, 0.05, 0.3, 0.7, 0.95, 0.999] {
            let z = normal_inverse_cdf(p, 0.0, 1.0).unwrap();
            assert_relative_eq!(normal_cdf(z, 0.0, 1.0), p, epsilon = 1e-9);
        }
    }

    #[test]
    fn normal_inverse_cdf_rejects_out_of_range() {
        for &p in &[0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                normal_inverse_cdf(p, 0.0, 1.0),
                Err(ForecastError::InvalidArgument(_))
            ));
        }
        assert!(normal_inverse_cdf(0.5, 0.0, 0.0).is_err());
    }

    #[test]
    fn chi_square_cdf_wilson_hilferty() {
        // 95th percentile of chi-square(10) is 18.307
        assert_relative_eq!(chi_square_cdf(18.307, 10.0), 0.95, epsilon = 2e-3);
        // 95th percentile of chi-square(2) is 5.991
        assert_relative_eq!(chi_square_cdf(5.991, 2.0), 0.95, epsilon = 5e-3);
        assert_eq!(chi_square_cdf(0.0, 3.0), 0.0);
        assert_eq!(chi_square_cdf(-1.0, 3.0), 0.0);
    }

    #[test]
    fn chi_square_inverse_cdf_inverts_cdf() {
        for &df in &[1.0, 2.0, 5.0, 20.0] {
            for &p in &[0.1, 0.5, 0.95] {
                let x = chi_square_inverse_cdf(p, df).unwrap();
                assert!(x > 0.0);
                assert_relative_eq!(chi_square_cdf(x, df), p, epsilon = 1e-8);
            }
        }
        assert!(chi_square_inverse_cdf(1.0, 2.0).is_err());
        assert!(chi_square_inverse_cdf(0.5, 0.0).is_err());
    }

    #[test]
    fn gamma_matches_factorials() {
        assert_relative_eq!(gamma(1.0), 1.0, epsilon = 1e-10);
        assert_relative_eq!(gamma(5.0), 24.0, epsilon = 1e-8);
        assert_relative_eq!(gamma(0.5), PI.sqrt(), epsilon = 1e-10);
        // Reflection branch
        assert_relative_eq!(gamma(-0.5), -2.0 * PI.sqrt(), epsilon = 1e-9);
        assert!(gamma(0.0).is_nan());
    }

    #[test]
    fn log_gamma_matches_gamma() {
        for &z in &[0.3, 1.5, 4.2, 10.0, 30.0] {
            assert_relative_eq!(log_gamma(z), gamma(z).abs().ln(), epsilon = 1e-9);
        }
        assert_relative_eq!(log_gamma(101.0), 363.739_375_555_563_5, epsilon = 1e-8);
    }

    #[test]
    fn erf_symmetry() {
        assert_relative_eq!(erf(0.0), 0.0, epsilon = 1e-7);
        assert_relative_eq!(erf(1.0), 0.842_700_79, epsilon = 1e-6);
        assert_relative_eq!(erf(-1.0), -erf(1.0), epsilon = 1e-12);
    }

    #[test]
    fn descriptive_statistics() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(mean(&v), 3.0, epsilon = 1e-12);
        assert_relative_eq!(variance(&v), 2.5, epsilon = 1e-12);
        assert_relative_eq!(population_variance(&v), 2.0, epsilon = 1e-12);
        assert_relative_eq!(std_dev(&v), 2.5_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(median(&[5.0, 1.0, 3.0, 2.0]), 2.5, epsilon = 1e-12);
        assert_relative_eq!(skewness(&v), 0.0, epsilon = 1e-12);
        // Uniform-like spread: kurtosis 1.7
        assert_relative_eq!(kurtosis(&v), 1.7, epsilon = 1e-12);
        assert!(mean(&[]).is_nan());
        assert!(variance(&[1.0]).is_nan());
    }

    #[test]
    fn skewness_sign_follows_tail() {
        let right_tail = [1.0, 1.0, 1.0, 2.0, 10.0];
        assert!(skewness(&right_tail) > 0.0);
        let left_tail = [-10.0, 1.0, 2.0, 2.0, 2.0];
        assert!(skewness(&left_tail) < 0.0);
    }

    #[test]
    fn acf_lag_zero_is_one() {
        let values: Vec<f64> = (0..20).map(|i| (i as f64 * 0.7).sin()).collect();
        let rho = acf(&values, 5);
        assert_eq!(rho.len(), 6);
        assert_relative_eq!(rho[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(rho[3], autocorrelation(&values, 3), epsilon = 1e-12);
    }

    #[test]
    fn acf_caps_lag_and_handles_constant() {
        assert_eq!(acf(&[1.0, 2.0, 3.0], 10).len(), 3);
        let flat = acf(&[4.0; 10], 3);
        assert_eq!(flat, vec![1.0, 0.0, 0.0, 0.0]);
        assert!(acf(&[], 3).is_empty());
    }

    #[test]
    fn pacf_of_ar1_cuts_off_after_lag_one() {
        let mut values = vec![0.0; 400];
        for t in 1..400 {
            let shock = ((t as f64 * 12.9898).sin() * 43_758.545_3).fract();
            values[t] = 0.6 * values[t - 1] + shock;
        }
        let partial = pacf(&values, 4);
        let rho = acf(&values, 1);
        assert_relative_eq!(partial[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(partial[1], rho[1], epsilon = 1e-12);
        assert!(partial[1] > 0.4);
        for lag in 2..=4 {
            assert!(partial[lag].abs() < 0.2, "lag {lag}: {}", partial[lag]);
        }
    }

    #[test]
    fn standard_error_of_fold_scores() {
        // Deviations sum of squares = 2, k = 3 -> sqrt(2 / 6)
        let se = standard_error(&[1.0, 2.0, 3.0]);
        assert_relative_eq!(se, (2.0_f64 / 6.0).sqrt(), epsilon = 1e-12);
        assert_eq!(standard_error(&[5.0]), 0.0);
    }
}
