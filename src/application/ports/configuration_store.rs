use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ConfigurationId, GameConfiguration, LlmModel, ValidationError};

#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// The complete active configuration at call time; later activations do not affect it.
    async fn active_snapshot(&self) -> Result<Arc<GameConfiguration>, ConfigurationError>;

    async fn activate(&self, id: &ConfigurationId) -> Result<(), ConfigurationError>;

    async fn registered_models(&self) -> Result<Vec<LlmModel>, ConfigurationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("no active configuration")]
    NoActiveConfiguration,
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),
}
