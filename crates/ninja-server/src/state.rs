//! Shared router state

use ninja_predict::{PredictConfig, PredictionCache, Provider, Scheduler};
use std::sync::Arc;
use std::time::Instant;

/// Read-only handles the HTTP handlers need
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PredictConfig>,
    pub cache: PredictionCache,
    pub scheduler: Scheduler,
    pub providers: Arc<[Provider]>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<PredictConfig>, scheduler: Scheduler) -> Self {
        Self {
            config,
            cache: scheduler.cache().clone(),
            providers: scheduler.providers().into(),
            scheduler,
            started_at: Instant::now(),
        }
    }
}
