//! Application state.

use std::sync::Arc;

use autopost_pipeline::RunOrchestrator;
use autopost_storage::ObjectStorage;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<RunOrchestrator>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        config: ApiConfig,
        orchestrator: Arc<RunOrchestrator>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            storage,
        }
    }
}
