//! The assistant's tool catalogue.
//!
//! Each module wraps one integration behind the [`Tool`] trait from
//! `hearth-agents`. [`build_catalog`] assembles a registry from the
//! configuration: integration sections that are absent register nothing.

use hearth_agents::ToolRegistry;
use hearth_common::Result;
use hearth_config::AppConfig;
use hearth_db::SessionStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub mod google;
pub mod home_assistant;
pub mod matrix;
pub mod overseer;
pub mod python;
pub mod schedule;
pub mod wikipedia;

pub use google::{
    CalendarCreateEventTool, CalendarListEventsTool, GoogleApi, TasksCreateTool, TasksListTool,
};
pub use home_assistant::{
    ControlEntitiesTool, GetEntityStateTool, HomeAssistantApi, ListEntitiesTool, NotifyAlexaTool,
    TurnOnLightsTool,
};
pub use matrix::MatrixSendMessageTool;
pub use overseer::{OverseerDownloadTool, OverseerSearchTool, OverseerrApi};
pub use python::PythonReplTool;
pub use schedule::{ScheduleActionTool, TimerTool};
pub use wikipedia::WikipediaTool;

/// Build the tool registry for this configuration.
pub fn build_catalog(config: &AppConfig, store: Arc<Mutex<SessionStore>>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::default();

    registry.register(Arc::new(ScheduleActionTool::new(Arc::clone(&store))))?;
    if config.tools.enable_python {
        registry.register(Arc::new(PythonReplTool::new()))?;
    }
    if config.tools.enable_wikipedia {
        registry.register(Arc::new(WikipediaTool::new()))?;
    }

    if let Some(ha) = &config.home_assistant {
        let api = Arc::new(HomeAssistantApi::new(&ha.base_url, &ha.api_key));
        registry.register(Arc::new(ListEntitiesTool::new(api.clone())))?;
        registry.register(Arc::new(GetEntityStateTool::new(api.clone())))?;
        registry.register(Arc::new(ControlEntitiesTool::new(api.clone())))?;
        registry.register(Arc::new(TurnOnLightsTool::new(api.clone())))?;
        registry.register(Arc::new(NotifyAlexaTool::new(api)))?;
        registry.register(Arc::new(TimerTool::new(Arc::clone(&store))))?;
    }

    if let Some(google) = &config.google {
        let api = Arc::new(GoogleApi::new(google));
        registry.register(Arc::new(CalendarListEventsTool::new(api.clone())))?;
        registry.register(Arc::new(CalendarCreateEventTool::new(api.clone())))?;
        registry.register(Arc::new(TasksListTool::new(api.clone())))?;
        registry.register(Arc::new(TasksCreateTool::new(api)))?;
    }

    if let Some(matrix) = &config.matrix {
        registry.register(Arc::new(MatrixSendMessageTool::new(matrix)))?;
    }

    if let Some(overseerr) = &config.overseerr {
        let api = Arc::new(OverseerrApi::new(overseerr));
        registry.register(Arc::new(OverseerSearchTool::new(api.clone())))?;
        registry.register(Arc::new(OverseerDownloadTool::new(api)))?;
    }

    info!(tools = registry.len(), "tool catalogue ready");
    Ok(registry)
}
