//! Numerical building blocks shared by models, validation and selection.

pub mod cross_validation;
pub mod linalg;
pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use cross_validation::{cross_validate, CVConfig, CVResults, CVStrategy};
pub use metrics::{calculate_metrics, AccuracyMetrics, MetricValue};
pub use ols::{ols_estimate, ols_fit, OLSResult, OlsEstimate};
pub use optimization::{newton_raphson, NewtonConfig, NewtonResult};
pub use stats::quantile_normal;
