//! SARIMA model orders and configuration.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-seasonal orders (p, d, q).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModelOrder {
    /// AR order.
    pub p: usize,
    /// Differencing order.
    pub d: usize,
    /// MA order.
    pub q: usize,
}

impl ModelOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Build from signed components, rejecting negatives.
    pub fn from_signed(p: i64, d: i64, q: i64) -> Result<Self> {
        Ok(Self {
            p: non_negative("p", p)?,
            d: non_negative("d", d)?,
            q: non_negative("q", q)?,
        })
    }
}

/// Seasonal orders (P, D, Q) at a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonalOrder {
    /// Seasonal AR, differencing and MA orders.
    pub order: ModelOrder,
    /// Season length in observations.
    pub period: usize,
}

impl SeasonalOrder {
    /// Create a seasonal order.
    ///
    /// # Errors
    /// `InvalidConfig` when `period` is zero.
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Result<Self> {
        let order = Self {
            order: ModelOrder::new(p, d, q),
            period,
        };
        order.validate()?;
        Ok(order)
    }

    /// Build from signed components, rejecting negatives and non-positive periods.
    pub fn from_signed(p: i64, d: i64, q: i64, period: i64) -> Result<Self> {
        if period < 1 {
            return Err(ForecastError::InvalidConfig(format!(
                "seasonal period must be >= 1, got {period}"
            )));
        }
        Ok(Self {
            order: ModelOrder::from_signed(p, d, q)?,
            period: period as usize,
        })
    }

    /// Whether all seasonal orders are zero.
    pub fn is_trivial(&self) -> bool {
        self.order == ModelOrder::default()
    }

    fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(ForecastError::InvalidConfig(
                "seasonal period must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_negative(name: &str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        ForecastError::InvalidConfig(format!("order {name} must be non-negative, got {value}"))
    })
}

/// Full SARIMA configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Non-seasonal orders.
    pub order: ModelOrder,
    /// Zero or more simultaneous seasonal components.
    pub seasonal_orders: Vec<SeasonalOrder>,
    /// Convergence tolerance on the log-likelihood change.
    pub tolerance: f64,
    /// Newton-Raphson iteration budget.
    pub max_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            order: ModelOrder::default(),
            seasonal_orders: Vec::new(),
            tolerance: 1e-6,
            max_iterations: 1000,
        }
    }
}

impl ModelConfig {
    /// Non-seasonal configuration with default tolerance and iteration budget.
    pub fn new(order: ModelOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    /// Non-seasonal configuration from signed orders.
    ///
    /// # Errors
    /// `InvalidConfig` when any order is negative.
    pub fn from_signed(p: i64, d: i64, q: i64) -> Result<Self> {
        Ok(Self::new(ModelOrder::from_signed(p, d, q)?))
    }

    /// Add a seasonal component.
    pub fn with_seasonal(mut self, seasonal: SeasonalOrder) -> Self {
        self.seasonal_orders.push(seasonal);
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Check every invariant of the configuration.
    pub fn validate(&self) -> Result<()> {
        for seasonal in &self.seasonal_orders {
            seasonal.validate()?;
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(ForecastError::InvalidConfig(
                "max_iterations must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of ARMA coefficients estimated.
    pub fn num_parameters(&self) -> usize {
        self.order.p
            + self.order.q
            + self
                .seasonal_orders
                .iter()
                .map(|s| s.order.p + s.order.q)
                .sum::<usize>()
    }

    /// Largest lag of the expanded AR polynomial.
    pub fn ar_span(&self) -> usize {
        self.order.p
            + self
                .seasonal_orders
                .iter()
                .map(|s| s.order.p * s.period)
                .sum::<usize>()
    }

    /// Largest lag of the expanded MA polynomial.
    pub fn ma_span(&self) -> usize {
        self.order.q
            + self
                .seasonal_orders
                .iter()
                .map(|s| s.order.q * s.period)
                .sum::<usize>()
    }

    /// Differencing lags in application order: seasonal passes, then regular.
    pub fn difference_lags(&self) -> Vec<usize> {
        let mut lags = Vec::new();
        for seasonal in &self.seasonal_orders {
            lags.extend(std::iter::repeat(seasonal.period).take(seasonal.order.d));
        }
        lags.extend(std::iter::repeat(1).take(self.order.d));
        lags
    }

    /// Observations consumed by differencing.
    pub fn difference_loss(&self) -> usize {
        self.difference_lags().iter().sum()
    }

    /// Fewest observations a fit accepts.
    pub fn min_observations(&self) -> usize {
        self.difference_loss() + self.ar_span().max(self.ma_span()) + 2
    }

    /// Seasonal periods carried by this configuration.
    pub fn periods(&self) -> Vec<usize> {
        self.seasonal_orders.iter().map(|s| s.period).collect()
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.order;
        if self.seasonal_orders.is_empty() {
            write!(f, "ARIMA({},{},{})", o.p, o.d, o.q)
        } else {
            write!(f, "SARIMA({},{},{})", o.p, o.d, o.q)?;
            for s in &self.seasonal_orders {
                write!(f, "({},{},{})[{}]", s.order.p, s.order.d, s.order.q, s.period)?;
            }
            Ok(())
        }
    }
}
