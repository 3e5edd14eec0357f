//! Cross-checks of the numerical primitives against statrs.

mod common;

use approx::assert_abs_diff_eq;
use common::gaussian;
use sarimax_forecast::utils::stats;
use sarimax_forecast::validation::{jarque_bera, ljung_box};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use statrs::function::{erf, gamma};
use statrs::statistics::Statistics;

#[test]
fn normal_distribution_matches() {
    let reference = Normal::new(0.0, 1.0).unwrap();
    for &x in &[-3.0, -1.5, -0.2, 0.0, 0.7, 1.96, 2.5] {
        assert_abs_diff_eq!(stats::normal_cdf(x, 0.0, 1.0), reference.cdf(x), epsilon = 5e-7);
    }
    for &p in &[0.001, 0.025, 0.3, 0.5, 0.8, 0.975, 0.999] {
        let ours = stats::normal_inverse_cdf(p, 0.0, 1.0).unwrap();
        assert_abs_diff_eq!(ours, reference.inverse_cdf(p), epsilon = 1e-6);
    }
}

#[test]
fn chi_square_approximation_is_close() {
    for &df in &[3.0, 5.0, 10.0, 24.0] {
        let reference = ChiSquared::new(df).unwrap();
        for &q in &[0.5, 1.0, 1.5, 2.0] {
            let x = q * df;
            assert_abs_diff_eq!(stats::chi_square_cdf(x, df), reference.cdf(x), epsilon = 0.01);
        }
    }
}

#[test]
fn special_functions_match() {
    for &x in &[-2.0, -0.5, 0.1, 0.9, 1.7] {
        assert_abs_diff_eq!(stats::erf(x), erf::erf(x), epsilon = 5e-7);
    }
    for &z in &[0.5, 1.0, 2.5, 5.0, 7.3] {
        assert_abs_diff_eq!(stats::gamma(z), gamma::gamma(z), epsilon = 1e-6 * gamma::gamma(z));
        assert_abs_diff_eq!(stats::log_gamma(z), gamma::ln_gamma(z), epsilon = 1e-8);
    }
}

#[test]
fn descriptive_statistics_match() {
    let data = gaussian(500, 3.0, 1.5, 17);
    assert_abs_diff_eq!(stats::mean(&data), data.iter().mean(), epsilon = 1e-10);
    assert_abs_diff_eq!(stats::variance(&data), data.iter().variance(), epsilon = 1e-10);
    assert_abs_diff_eq!(stats::std_dev(&data), data.iter().std_dev(), epsilon = 1e-10);
}

#[test]
fn residual_tests_accept_white_noise() {
    let noise = gaussian(400, 0.0, 1.0, 123);
    assert!(ljung_box(&noise, Some(10), 0).p_value > 0.01);
    assert!(jarque_bera(&noise).p_value > 0.01);

    let mut trending = noise.clone();
    for (t, v) in trending.iter_mut().enumerate() {
        *v += 0.05 * t as f64;
    }
    assert!(ljung_box(&trending, Some(10), 0).p_value < 0.01);
}

#[test]
fn acf_of_ar1_decays_geometrically() {
    let values = common::ar1(2000, 0.7, 0.0, 9);
    let acf = stats::acf(&values, 3);
    assert_abs_diff_eq!(acf[1], 0.7, epsilon = 0.06);
    assert_abs_diff_eq!(acf[2], 0.49, epsilon = 0.08);

    let pacf = stats::pacf(&values, 3);
    assert_abs_diff_eq!(pacf[1], 0.7, epsilon = 0.06);
    assert!(pacf[2].abs() < 0.08);
}
