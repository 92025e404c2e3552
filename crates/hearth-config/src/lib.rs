pub mod loader;
pub mod model;

pub use loader::ConfigLoader;
pub use model::{
    AgentConfig, AppConfig, GatewayConfig, GoogleConfig, HomeAssistantConfig, LlmConfig,
    MatrixConfig, OverseerrConfig, StorageConfig, ToolsConfig,
};
