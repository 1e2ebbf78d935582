//! Application state shared across handlers

use crate::inference::PredictService;
use std::sync::Arc;

/// Read-only after startup, so no locks
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<PredictService>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(service: Arc<PredictService>) -> Self {
        Self {
            service,
            started_at: chrono::Utc::now(),
        }
    }
}
