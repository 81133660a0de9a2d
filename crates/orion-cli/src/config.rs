use config::{Config as ConfigLoader, ConfigError, Environment, File};
use orion_types::ClientConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub conversation: ConversationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub stream_path: String,
    pub buffer_capacity: usize,
    pub page_size: usize,
    #[serde(default)]
    pub single_flight: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    pub title_max_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the anonymous snapshot and stored credentials
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. ORION_ environment variables, sections split by `__` (ORION_API__BASE_URL)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("ORION")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_base_url(&self.api.base_url)
            .with_stream_path(&self.api.stream_path)
            .with_buffer_capacity(self.api.buffer_capacity)
            .with_page_size(self.api.page_size)
            .with_single_flight(self.api.single_flight)
            .with_title_max_chars(self.conversation.title_max_chars)
    }
}
