use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level configuration. Every section is optional in the TOML file;
/// integration sections that stay `None` simply register no tools.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub storage: StorageConfig,
    pub tools: ToolsConfig,
    pub home_assistant: Option<HomeAssistantConfig>,
    pub google: Option<GoogleConfig>,
    pub matrix: Option<MatrixConfig>,
    pub overseerr: Option<OverseerrConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// How often the scheduler looks for due actions.
    pub scheduler_poll_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10055,
            scheduler_poll_secs: 5,
        }
    }
}

pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// OpenAI-compatible endpoint. `None` means api.openai.com.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 30,
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model-call rounds allowed per turn before the engine gives up.
    pub max_tool_rounds: usize,
    /// Persona text for the system prompt. `None` uses the built-in one.
    pub persona: Option<String>,
    /// IANA timezone rendered into the system prompt.
    pub timezone: String,
    /// Re-run context summarization every K turns. Off by default: a
    /// session is summarized once per process and the summary is reused
    /// as-is afterwards.
    pub resummarize_every_turns: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 25,
            persona: None,
            timezone: "America/Sao_Paulo".to_string(),
            resummarize_every_turns: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Explicit path, or the platform data dir.
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("hearth")
                .join("hearth.db")
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub enable_python: bool,
    pub enable_wikipedia: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enable_python: true,
            enable_wikipedia: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HomeAssistantConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixConfig {
    pub homeserver: String,
    pub access_token: String,
    /// Room name -> room id. Tool calls address rooms by name.
    #[serde(default)]
    pub rooms: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverseerrConfig {
    pub base_url: String,
    pub api_key: String,
}
