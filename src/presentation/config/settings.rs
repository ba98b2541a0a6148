use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::application::services::RetryPolicy;

use super::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub catalog: CatalogSettings,
    pub pipeline: PipelineSettings,
    pub stt: SttSettings,
    pub database: DatabaseSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    pub transient_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub rewrite_retries: u32,
}

impl PipelineSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_transient_retries: self.transient_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct SttSettings {
    pub whisper_url: String,
    pub whisper_model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub storage_dir: PathBuf,
    pub max_upload_mb: usize,
}

impl std::fmt::Debug for SttSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SttSettings")
            .field("whisper_url", &self.whisper_url)
            .field("whisper_model", &self.whisper_model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("storage_dir", &self.storage_dir)
            .field("max_upload_mb", &self.max_upload_mb)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    /// In-memory repositories are used when absent.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    pub connect_timeout_secs: u64,
}

impl Settings {
    /// Defaults, then `appsettings.{environment}.toml`, then `APP__SECTION__KEY` variables.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("logging.json", false)?
            .set_default("catalog.path", "config/game.toml")?
            .set_default("pipeline.transient_retries", 2)?
            .set_default("pipeline.initial_backoff_ms", 100)?
            .set_default("pipeline.max_backoff_ms", 1000)?
            .set_default("pipeline.backoff_multiplier", 2.0)?
            .set_default("pipeline.rewrite_retries", 2)?
            .set_default("stt.whisper_url", "http://localhost:8001/v1")?
            .set_default("stt.whisper_model", "whisper-1")?
            .set_default("stt.timeout_secs", 120)?
            .set_default("stt.storage_dir", "data")?
            .set_default("stt.max_upload_mb", 25)?
            .set_default("database.max_connections", 10)?
            .set_default("http.connect_timeout_secs", 10)?
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
