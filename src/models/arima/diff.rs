//! Differencing and integration for SARIMA models.
//!
//! A model's differencing is a chain of lag differences applied in order:
//! `D` passes at each seasonal period, then `d` passes at lag 1.

/// Apply one pass of `x[t] - x[t - lag]`.
pub fn lag_difference(series: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 || series.len() <= lag {
        return Vec::new();
    }
    series
        .iter()
        .skip(lag)
        .zip(series.iter())
        .map(|(curr, prev)| curr - prev)
        .collect()
}

/// Apply differencing to a time series.
///
/// # Arguments
/// * `series` - The input series
/// * `d` - Differencing order (number of times to difference)
///
/// # Returns
/// The differenced series, `d` values shorter than the input.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    (0..d).fold(series.to_vec(), |acc, _| lag_difference(&acc, 1))
}

/// Apply seasonal differencing to a time series.
///
/// # Arguments
/// * `series` - The input series
/// * `d` - Seasonal differencing order
/// * `period` - Seasonal period
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    (0..d).fold(series.to_vec(), |acc, _| lag_difference(&acc, period))
}

/// Apply a chain of lag differences in order.
pub fn difference_chain(series: &[f64], lags: &[usize]) -> Vec<f64> {
    lags.iter()
        .fold(series.to_vec(), |acc, &lag| lag_difference(&acc, lag))
}

/// Pure integration: `d` cumulative sums, each seeded with a leading zero.
///
/// The result is `d` values longer than the input and satisfies
/// `difference(&cumulate(x, d), d) == x`.
pub fn cumulate(series: &[f64], d: usize) -> Vec<f64> {
    (0..d).fold(series.to_vec(), |acc, _| {
        let mut out = Vec::with_capacity(acc.len() + 1);
        let mut sum = 0.0;
        out.push(sum);
        for v in acc {
            sum += v;
            out.push(sum);
        }
        out
    })
}

/// Continue a lag-differenced series past the end of `history`.
///
/// `differenced` holds future values of `x[t] - x[t - lag]`; the returned
/// values are the matching future levels of `x`.
pub fn integrate_lag(differenced: &[f64], history: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 || history.len() < lag {
        return differenced.to_vec();
    }
    let mut extended: Vec<f64> = history[history.len() - lag..].to_vec();
    for &d in differenced {
        let base = extended[extended.len() - lag];
        extended.push(d + base);
    }
    extended.split_off(lag)
}

/// Undo a chain of lag differences on values that continue `history`.
///
/// `lags` is in application order; `history` is the undifferenced series.
pub fn integrate_chain(differenced: &[f64], history: &[f64], lags: &[usize]) -> Vec<f64> {
    let mut levels = Vec::with_capacity(lags.len());
    let mut current = history.to_vec();
    for &lag in lags {
        let next = lag_difference(&current, lag);
        levels.push(current);
        current = next;
    }

    levels
        .iter()
        .zip(lags)
        .rev()
        .fold(differenced.to_vec(), |acc, (level, &lag)| {
            integrate_lag(&acc, level, lag)
        })
}

/// Integrate (reverse differencing) a differenced series.
///
/// # Arguments
/// * `differenced` - Future values of the `d`-times differenced series
/// * `original` - The original series the future values continue
/// * `d` - Differencing order used
pub fn integrate(differenced: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    integrate_chain(differenced, original, &vec![1; d])
}
