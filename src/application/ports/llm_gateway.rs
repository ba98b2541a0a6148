use async_trait::async_trait;

use crate::domain::{Message, ModelId};

use super::{InvocationOptions, LlmClientError};

/// Model invocation by registry id. Implementations never retry.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn invoke(
        &self,
        model: &ModelId,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<String, LlmClientError>;
}
