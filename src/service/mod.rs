//! Forecasting service: model lifecycle on top of a pluggable store.
//!
//! [`ForecastingService`] owns no state of its own. Every model record,
//! forecast and observation goes through a [`ModelStore`].

mod forecasting;
mod options;
mod store;

pub use forecasting::{
    DiagnosticResult, ForecastAccuracy, ForecastingService, InformationCriteria, PreprocessedData,
    ResidualTests, TrainingReport,
};
pub use options::{ForecastOptions, PreprocessOptions, TrainOptions};
pub use store::{InMemoryModelStore, ModelStore, StoredModel};
