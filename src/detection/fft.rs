//! FFT-based spectral estimation.

use rustfft::{num_complex::Complex64, FftPlanner};
use serde::{Deserialize, Serialize};

/// Compute the FFT of a real-valued signal.
///
/// Only the non-negative frequencies 0..=N/2 are returned since the
/// spectrum of a real signal is symmetric.
pub fn fft_real(signal: &[f64]) -> Vec<Complex64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer.truncate(n / 2 + 1);
    buffer
}

/// Raw periodogram of a demeaned series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Periodogram {
    /// Fourier frequencies `k/n` in cycles per observation, `k = 1..=n/2`.
    pub frequencies: Vec<f64>,
    /// `|X_k|² / n` at each frequency.
    pub power: Vec<f64>,
}

impl Periodogram {
    /// Number of frequencies.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Period in observations at frequency index `i`, rounded to the
    /// nearest integer.
    pub fn period_at(&self, i: usize) -> Option<usize> {
        self.frequencies
            .get(i)
            .filter(|f| **f > 0.0)
            .map(|f| (1.0 / f).round() as usize)
    }

    /// Indices of local maxima in power, strongest first.
    pub fn peaks(&self) -> Vec<usize> {
        let p = &self.power;
        let mut peaks: Vec<usize> = (0..p.len())
            .filter(|&i| {
                let left = i == 0 || p[i] > p[i - 1];
                let right = i + 1 == p.len() || p[i] >= p[i + 1];
                left && right && p[i] > 0.0
            })
            .collect();
        peaks.sort_by(|&a, &b| p[b].partial_cmp(&p[a]).unwrap_or(std::cmp::Ordering::Equal));
        peaks
    }
}

/// Compute the periodogram of `data`.
///
/// The series is demeaned so the zero frequency carries no power and is
/// omitted. Series shorter than four points give an empty periodogram.
pub fn periodogram(data: &[f64]) -> Periodogram {
    let n = data.len();
    if n < 4 {
        return Periodogram {
            frequencies: Vec::new(),
            power: Vec::new(),
        };
    }

    let mean = data.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = data.iter().map(|x| x - mean).collect();
    let spectrum = fft_real(&centered);

    let (frequencies, power) = spectrum
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| (k as f64 / n as f64, c.norm_sqr() / n as f64))
        .unzip();

    Periodogram { frequencies, power }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn fft_of_constant_is_dc_only() {
        let result = fft_real(&[1.0; 8]);
        assert_eq!(result.len(), 5);
        assert_relative_eq!(result[0].re, 8.0, epsilon = 1e-10);
        for c in &result[1..] {
            assert!(c.norm() < 1e-10);
        }
    }

    #[test]
    fn periodogram_matches_direct_summation() {
        let data: Vec<f64> = (0..24).map(|t| (t as f64 * 0.37).sin() + 0.1 * t as f64).collect();
        let pg = periodogram(&data);
        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;

        for (i, &f) in pg.frequencies.iter().enumerate() {
            let (mut re, mut im) = (0.0, 0.0);
            for (t, x) in data.iter().enumerate() {
                let angle = 2.0 * PI * f * t as f64;
                re += (x - mean) * angle.cos();
                im -= (x - mean) * angle.sin();
            }
            assert_relative_eq!(pg.power[i], (re * re + im * im) / n, epsilon = 1e-9);
        }
    }

    #[test]
    fn peak_at_seasonal_frequency() {
        let data: Vec<f64> = (0..84)
            .map(|t| (2.0 * PI * t as f64 / 7.0).sin())
            .collect();
        let pg = periodogram(&data);
        assert_eq!(pg.len(), 42);

        let peaks = pg.peaks();
        assert_eq!(pg.period_at(peaks[0]), Some(7));
    }

    #[test]
    fn short_series_is_empty() {
        assert!(periodogram(&[1.0, 2.0, 3.0]).is_empty());
        assert!(fft_real(&[]).is_empty());
    }
}
