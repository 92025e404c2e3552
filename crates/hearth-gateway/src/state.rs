use std::sync::Arc;

use hearth_agents::AgentRuntime;
use hearth_config::AppConfig;

/// Shared handles for the HTTP handlers.
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(runtime: Arc<AgentRuntime>, config: AppConfig) -> Self {
        Self { runtime, config }
    }
}

pub type SharedState = Arc<AppState>;
