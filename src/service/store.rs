//! Persistence collaborator used by the forecasting service.

use crate::core::{ForecastPoint, ForecastResult, TimeSeriesPoint};
use crate::error::{ForecastError, Result};
use crate::models::arima::{FittedState, ModelConfig};
use crate::transform::ScaleParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Everything persisted for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModel {
    pub config: ModelConfig,
    /// Absent until the model is trained.
    pub state: Option<FittedState>,
    /// Free-form caller metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub trained_at: Option<DateTime<Utc>>,
    /// Timestamp of the last training observation.
    pub last_observation: Option<DateTime<Utc>>,
    /// Sampling interval of the training data, in seconds.
    pub frequency_secs: Option<i64>,
    /// Normalization applied before fitting; forecasts are mapped back with it.
    pub normalization: Option<ScaleParams>,
}

impl StoredModel {
    /// A new, untrained record.
    pub fn new(config: ModelConfig, metadata: HashMap<String, String>) -> Self {
        Self {
            config,
            state: None,
            metadata,
            created_at: Utc::now(),
            trained_at: None,
            last_observation: None,
            frequency_secs: None,
            normalization: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }
}

/// Storage for models, forecasts and the raw observations behind them.
///
/// Implementations must be safe to share across threads.
pub trait ModelStore: Send + Sync {
    /// Persist `model`. `None` creates a new record and returns its id;
    /// `Some(id)` replaces an existing record.
    fn save_model(&self, id: Option<&str>, model: &StoredModel) -> Result<String>;

    /// Load a model record.
    fn load_model(&self, id: &str) -> Result<StoredModel>;

    /// Persist forecast points generated for a model.
    fn save_forecast_results(&self, id: &str, points: &[ForecastPoint]) -> Result<()>;

    /// Most recent observations for a model, oldest first. `limit` caps the
    /// number returned.
    fn get_historical_data(&self, id: &str, limit: Option<usize>) -> Result<Vec<TimeSeriesPoint>>;
}

/// In-memory [`ModelStore`] for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct InMemoryModelStore {
    models: Arc<RwLock<HashMap<String, StoredModel>>>,
    forecasts: Arc<RwLock<HashMap<String, Vec<ForecastResult>>>>,
    history: Arc<RwLock<HashMap<String, Vec<TimeSeriesPoint>>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append observations to a model's history.
    pub fn append_historical_data(&self, id: &str, points: &[TimeSeriesPoint]) -> Result<()> {
        self.require(id)?;
        let mut history = self.history.write().map_err(poisoned)?;
        history
            .entry(id.to_string())
            .or_default()
            .extend_from_slice(points);
        Ok(())
    }

    /// Every forecast saved for a model, oldest first.
    pub fn forecast_results(&self, id: &str) -> Result<Vec<ForecastResult>> {
        let forecasts = self.forecasts.read().map_err(poisoned)?;
        Ok(forecasts.get(id).cloned().unwrap_or_default())
    }

    /// Number of stored models.
    pub fn len(&self) -> usize {
        self.models.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn require(&self, id: &str) -> Result<()> {
        let models = self.models.read().map_err(poisoned)?;
        if models.contains_key(id) {
            Ok(())
        } else {
            Err(ForecastError::ModelNotFound(id.to_string()))
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> ForecastError {
    ForecastError::Storage("store lock poisoned".to_string())
}

impl ModelStore for InMemoryModelStore {
    fn save_model(&self, id: Option<&str>, model: &StoredModel) -> Result<String> {
        let mut models = self.models.write().map_err(poisoned)?;
        let id = match id {
            Some(id) if models.contains_key(id) => id.to_string(),
            Some(id) => return Err(ForecastError::ModelNotFound(id.to_string())),
            None => format!("model-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
        };
        models.insert(id.clone(), model.clone());
        Ok(id)
    }

    fn load_model(&self, id: &str) -> Result<StoredModel> {
        let models = self.models.read().map_err(poisoned)?;
        models
            .get(id)
            .cloned()
            .ok_or_else(|| ForecastError::ModelNotFound(id.to_string()))
    }

    fn save_forecast_results(&self, id: &str, points: &[ForecastPoint]) -> Result<()> {
        self.require(id)?;
        let mut forecasts = self.forecasts.write().map_err(poisoned)?;
        forecasts.entry(id.to_string()).or_default().push(ForecastResult {
            model_id: id.to_string(),
            generated_at: Utc::now(),
            points: points.to_vec(),
        });
        Ok(())
    }

    fn get_historical_data(&self, id: &str, limit: Option<usize>) -> Result<Vec<TimeSeriesPoint>> {
        self.require(id)?;
        let history = self.history.read().map_err(poisoned)?;
        let points = history.get(id).map(Vec::as_slice).unwrap_or_default();
        let start = limit.map_or(0, |l| points.len().saturating_sub(l));
        Ok(points[start..].to_vec())
    }
}
