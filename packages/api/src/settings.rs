use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use store::StoreConfig;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    /// Bearer token forwarded on every request.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Settings {
    /// Defaults, then `prospector.toml` if present, then `PROSPECTOR_*` variables
    /// (`PROSPECTOR_API__BASE_URL`, `PROSPECTOR_STORE__COLLECTIONS__USERS`, ...).
    pub fn new() -> Result<Self, ConfigError> {
        Self::load("prospector.toml")
    }

    pub fn load(path: &str) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("PROSPECTOR")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder().set_default("api.base_url", DEFAULT_BASE_URL)
}
