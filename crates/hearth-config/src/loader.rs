use hearth_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::model::{
    AppConfig, DEFAULT_MODEL, GoogleConfig, HomeAssistantConfig, MatrixConfig, OverseerrConfig,
};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const GROQ_DEFAULT_MODEL: &str = "llama3-70b-8192";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration: explicit path, then `HEARTH_CONFIG`, then the
    /// platform config dir, then built-in defaults. Environment variables
    /// override file values for secrets and endpoints.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        let mut config = match Self::resolve_path(path) {
            Some(file) => {
                info!(path = %file.display(), "loading config");
                Self::from_file(&file)?
            }
            None => {
                debug!("no config file found, using defaults");
                AppConfig::default()
            }
        };
        apply_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var("HEARTH_CONFIG") {
            return Some(PathBuf::from(path));
        }
        let default = dirs::config_dir()?.join("hearth").join("config.toml");
        default.exists().then_some(default)
    }
}

/// Fold environment variables into the config. Provider auto-selection
/// follows the original deployment: an explicit key wins, otherwise a Groq
/// key selects the Groq endpoint and its default model, otherwise an
/// OpenAI key selects api.openai.com.
fn apply_overrides(config: &mut AppConfig, get: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| get(name).filter(|v| !v.trim().is_empty());

    if let Some(base_url) = var("OPENAI_BASE_URL") {
        config.llm.base_url = Some(base_url);
    }
    if config.llm.api_key.is_none() {
        if let Some(key) = var("GROQ_API_KEY") {
            config.llm.api_key = Some(key);
            if config.llm.base_url.is_none() {
                config.llm.base_url = Some(GROQ_BASE_URL.to_string());
            }
            if config.llm.model == DEFAULT_MODEL {
                config.llm.model = GROQ_DEFAULT_MODEL.to_string();
            }
        } else if let Some(key) = var("OPENAI_API_KEY") {
            config.llm.api_key = Some(key);
        }
    }

    if let Some(db_path) = var("HEARTH_DB_PATH") {
        config.storage.db_path = Some(PathBuf::from(db_path));
    }

    if let (Some(base_url), Some(api_key)) = (var("HOMEASSISTANT_URL"), var("HOMEASSISTANT_KEY")) {
        config.home_assistant = Some(HomeAssistantConfig { base_url, api_key });
    }

    if let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
        var("GOOGLE_CLIENT_ID"),
        var("GOOGLE_CLIENT_SECRET"),
        var("GOOGLE_REFRESH_TOKEN"),
    ) {
        config.google = Some(GoogleConfig {
            client_id,
            client_secret,
            refresh_token,
        });
    }

    if let (Some(homeserver), Some(access_token)) =
        (var("MATRIX_HOMESERVER"), var("MATRIX_ACCESS_TOKEN"))
    {
        let rooms = config
            .matrix
            .take()
            .map(|m| m.rooms)
            .unwrap_or_default();
        config.matrix = Some(MatrixConfig {
            homeserver,
            access_token,
            rooms,
        });
    }

    if let (Some(base_url), Some(api_key)) = (var("OVERSEERR_URL"), var("OVERSEERR_API_KEY")) {
        config.overseerr = Some(OverseerrConfig { base_url, api_key });
    }
}
