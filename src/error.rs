//! Error types for the sarimax-forecast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur during fitting, validation, selection and forecasting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Invalid model configuration or option combination.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Prediction or diagnostics requested before a successful fit.
    #[error("model must be fitted before prediction")]
    ModelNotFitted,

    /// Newton-Raphson exhausted its iteration budget.
    #[error("optimizer did not converge within {iterations} iterations")]
    DidNotConverge { iterations: usize },

    /// Insufficient data points for the requested orders.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid argument to a numerical routine (probability outside (0,1), singular matrix).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Every candidate configuration of a model search failed.
    #[error("no viable model: {failed} of {evaluated} candidates failed")]
    NoViableModel { evaluated: usize, failed: usize },

    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model identifier unknown to the store.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Failure reported by the persistence collaborator.
    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::InvalidConfig("period must be >= 1".to_string());
        assert_eq!(err.to_string(), "invalid configuration: period must be >= 1");

        let err = ForecastError::InsufficientData { needed: 10, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 10, got 5"
        );

        let err = ForecastError::DidNotConverge { iterations: 1000 };
        assert_eq!(
            err.to_string(),
            "optimizer did not converge within 1000 iterations"
        );

        let err = ForecastError::NoViableModel {
            evaluated: 12,
            failed: 12,
        };
        assert_eq!(err.to_string(), "no viable model: 12 of 12 candidates failed");

        let err = ForecastError::ModelNotFitted;
        assert_eq!(err.to_string(), "model must be fitted before prediction");
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::EmptyData;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync + std::error::Error>() {}
        assert_impl::<ForecastError>();
    }
}
