//! Newton-Raphson maximization with finite-difference derivatives.
//!
//! The objective is treated as a black box: the gradient and Hessian are
//! approximated by central differences and each Newton direction is obtained
//! from a Cholesky solve of the ridge-regularized negative Hessian.

use crate::error::{ForecastError, Result};
use crate::utils::linalg::{inverse_spd, solve_spd, Matrix};

/// Configuration for Newton-Raphson maximization.
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Convergence tolerance on the change in objective value.
    pub tolerance: f64,
    /// Finite-difference step for the gradient (default: 1e-8).
    pub gradient_step: f64,
    /// Finite-difference step for the Hessian (default: 1e-4).
    pub hessian_step: f64,
    /// Ridge added to the negative Hessian diagonal (default: 1e-6).
    pub ridge: f64,
    /// Initial step size (default: 0.01).
    pub initial_step: f64,
    /// Step growth factor on improvement (default: 1.2).
    pub step_growth: f64,
    /// Step shrink factor on non-improvement (default: 0.5).
    pub step_shrink: f64,
    /// Largest allowed step size (default: 1.0).
    pub max_step: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            gradient_step: 1e-8,
            hessian_step: 1e-4,
            ridge: 1e-6,
            initial_step: 0.01,
            step_growth: 1.2,
            step_shrink: 0.5,
            max_step: 1.0,
        }
    }
}

impl NewtonConfig {
    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Result of a converged Newton-Raphson run.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Maximizing parameters.
    pub parameters: Vec<f64>,
    /// Objective value at `parameters`.
    pub value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Hessian of the objective at `parameters`.
    pub hessian: Matrix,
}

impl NewtonResult {
    /// Covariance estimate `(-H)^-1`, the inverse observed information.
    ///
    /// Falls back to the reciprocal absolute diagonal when `-H` is not
    /// positive definite.
    pub fn covariance(&self, ridge: f64) -> Matrix {
        let negated: Matrix = self
            .hessian
            .iter()
            .map(|row| row.iter().map(|h| -h).collect())
            .collect();

        match inverse_spd(&negated, ridge) {
            Ok(cov) => cov,
            Err(_) => {
                let n = negated.len();
                let mut cov = vec![vec![0.0; n]; n];
                for i in 0..n {
                    let d = negated[i][i].abs();
                    cov[i][i] = if d > 0.0 { 1.0 / d } else { f64::INFINITY };
                }
                cov
            }
        }
    }
}

/// Central-difference gradient of `f` at `x`.
pub fn numerical_gradient<F>(f: &F, x: &[f64], h: f64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut work = x.to_vec();
    (0..x.len())
        .map(|i| {
            work[i] = x[i] + h;
            let plus = f(&work);
            work[i] = x[i] - h;
            let minus = f(&work);
            work[i] = x[i];
            let g = (plus - minus) / (2.0 * h);
            if g.is_finite() {
                g
            } else {
                0.0
            }
        })
        .collect()
}

/// Central-difference Hessian of `f` at `x`.
pub fn numerical_hessian<F>(f: &F, x: &[f64], h: f64) -> Matrix
where
    F: Fn(&[f64]) -> f64,
{
    let n = x.len();
    let f0 = f(x);
    let mut work = x.to_vec();
    let mut hess = vec![vec![0.0; n]; n];

    for i in 0..n {
        work[i] = x[i] + h;
        let plus = f(&work);
        work[i] = x[i] - h;
        let minus = f(&work);
        work[i] = x[i];
        hess[i][i] = (plus - 2.0 * f0 + minus) / (h * h);

        for j in (i + 1)..n {
            let mut eval = |di: f64, dj: f64| {
                work[i] = x[i] + di;
                work[j] = x[j] + dj;
                let v = f(&work);
                work[i] = x[i];
                work[j] = x[j];
                v
            };
            let pp = eval(h, h);
            let pm = eval(h, -h);
            let mp = eval(-h, h);
            let mm = eval(-h, -h);
            let value = (pp - pm - mp + mm) / (4.0 * h * h);
            hess[i][j] = value;
            hess[j][i] = value;
        }
    }

    for row in hess.iter_mut() {
        for v in row.iter_mut() {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
    }
    hess
}

/// Maximize `objective` starting from `initial`.
///
/// Each iteration solves `(-H + ridge I) d = g` by Cholesky and tries the
/// point `x + step * d`. The step grows on improvement and shrinks otherwise.
/// If `-H` stays indefinite after raising the ridge, the gradient itself is
/// used as the direction.
///
/// The search has converged once a trial changes the objective by less than
/// `tolerance`, or once the gradient vanishes.
///
/// # Errors
/// - `InvalidArgument` if the objective is not finite at `initial`
/// - `DidNotConverge` if `max_iterations` is exhausted
pub fn newton_raphson<F>(objective: F, initial: &[f64], config: &NewtonConfig) -> Result<NewtonResult>
where
    F: Fn(&[f64]) -> f64,
{
    let mut x = initial.to_vec();
    let mut value = objective(&x);
    if !value.is_finite() {
        return Err(ForecastError::InvalidArgument(
            "objective is not finite at the starting point".to_string(),
        ));
    }

    if x.is_empty() {
        return Ok(NewtonResult {
            parameters: x,
            value,
            iterations: 0,
            hessian: Vec::new(),
        });
    }

    let mut step = config.initial_step;

    for iteration in 1..=config.max_iterations {
        let gradient = numerical_gradient(&objective, &x, config.gradient_step);
        let grad_norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
        if grad_norm < config.tolerance {
            return Ok(finish(&objective, x, value, iteration, config));
        }

        let hessian = numerical_hessian(&objective, &x, config.hessian_step);
        let direction = newton_direction(&hessian, &gradient, config.ridge);

        let trial: Vec<f64> = x
            .iter()
            .zip(&direction)
            .map(|(xi, di)| xi + step * di)
            .collect();
        let trial_value = objective(&trial);
        let change = trial_value - value;

        if trial_value.is_finite() && change > 0.0 {
            x = trial;
            value = trial_value;
            step = (step * config.step_growth).min(config.max_step);
        } else {
            step *= config.step_shrink;
        }

        if change.is_finite() && change.abs() < config.tolerance {
            return Ok(finish(&objective, x, value, iteration, config));
        }
    }

    Err(ForecastError::DidNotConverge {
        iterations: config.max_iterations,
    })
}

fn finish<F>(objective: &F, x: Vec<f64>, value: f64, iterations: usize, config: &NewtonConfig) -> NewtonResult
where
    F: Fn(&[f64]) -> f64,
{
    let hessian = numerical_hessian(objective, &x, config.hessian_step);
    NewtonResult {
        parameters: x,
        value,
        iterations,
        hessian,
    }
}

fn newton_direction(hessian: &[Vec<f64>], gradient: &[f64], ridge: f64) -> Vec<f64> {
    let negated: Matrix = hessian
        .iter()
        .map(|row| row.iter().map(|h| -h).collect())
        .collect();

    let scale = negated
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(1.0_f64, f64::max);

    let mut lambda = ridge;
    while lambda <= scale * 1e6 {
        if let Ok(d) = solve_spd(&negated, gradient, lambda) {
            if d.iter().all(|v| v.is_finite()) {
                return d;
            }
        }
        lambda *= 100.0;
    }

    let norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt().max(1.0);
    gradient.iter().map(|g| g / norm).collect()
}
