//! Automatic model selection.
//!
//! Candidate SARIMA configurations are generated from order bounds and the
//! seasonal periods of the data, fit independently (optionally in parallel
//! batches) and ranked by an information criterion or cross-validated error.

mod options;
mod search;

pub use options::{SelectionCriterion, SelectionOptions};
pub use search::{candidate_configs, ModelEvaluation, ModelSelection, SelectionResult};
