use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{FailureKind, Message};

/// Per-call knobs shared by every provider backend.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOptions {
    pub timeout: Duration,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask reasoning models to answer directly; used for yes/no judgments.
    pub disable_thinking: bool,
}

impl InvocationOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            temperature: None,
            max_tokens: None,
            disable_thinking: false,
        }
    }

    pub fn without_thinking(mut self) -> Self {
        self.disable_thinking = true;
        self
    }
}

/// One provider backend speaking its own wire format.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        model_identifier: &str,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<String, LlmClientError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmClientError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("rate limited")]
    RateLimited,
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

impl LlmClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LlmClientError::Timeout(_)
            | LlmClientError::ConnectionFailed(_)
            | LlmClientError::RateLimited
            | LlmClientError::ProviderUnavailable(_) => FailureKind::Transient,
            LlmClientError::AuthenticationFailed(_) => FailureKind::Auth,
            LlmClientError::ApiRequestFailed(_)
            | LlmClientError::InvalidResponse(_)
            | LlmClientError::UnknownModel(_) => FailureKind::Model,
        }
    }
}
