//! Shared fixtures for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sarimax_forecast::core::{TimeSeries, TimeSeriesPoint};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
    (0..n).map(|i| start() + Duration::days(i as i64)).collect()
}

pub fn make_ts(values: &[f64]) -> TimeSeries {
    TimeSeries::univariate(make_timestamps(values.len()), values.to_vec()).unwrap()
}

pub fn make_points(values: &[f64], offset: usize) -> Vec<TimeSeriesPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| TimeSeriesPoint::new(start() + Duration::days((offset + i) as i64), v))
        .collect()
}

/// Gaussian white noise from a fixed seed.
pub fn gaussian(n: usize, mean: f64, std_dev: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(mean, std_dev).unwrap();
    (0..n).map(|_| normal.sample(&mut rng)).collect()
}

/// `x[t] = mean + phi * (x[t-1] - mean) + e[t]` with standard normal shocks.
pub fn ar1(n: usize, phi: f64, mean: f64, seed: u64) -> Vec<f64> {
    let shocks = gaussian(n + 50, 0.0, 1.0, seed);
    let mut x = 0.0;
    let mut out = Vec::with_capacity(n);
    for (t, e) in shocks.into_iter().enumerate() {
        x = phi * x + e;
        if t >= 50 {
            out.push(mean + x);
        }
    }
    out
}

/// Weekly pattern plus Gaussian noise.
pub fn weekly(n: usize, seed: u64) -> Vec<f64> {
    let pattern = [12.0, 3.0, -4.0, -9.0, -2.0, 6.0, -6.0];
    gaussian(n, 0.0, 1.0, seed)
        .into_iter()
        .enumerate()
        .map(|(t, e)| 100.0 + pattern[t % 7] + e)
        .collect()
}
