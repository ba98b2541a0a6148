use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::ports::{InvocationOptions, LlmClient, LlmClientError};
use crate::domain::{ApiProvider, Message, MessageRole};

use super::http_error::{from_status, from_transport, missing_api_key};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicClient {
    client: Client,
    provider_name: String,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(client: Client, provider: &ApiProvider) -> Self {
        Self {
            client,
            provider_name: provider.name.clone(),
            base_url: provider.base_url(),
            api_key: provider.api_key.clone().filter(|key| !key.is_empty()),
        }
    }

    /// System messages travel out of band; everything else keeps its order.
    fn split_system(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage<'_>>) {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let rest = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();
        let system = (!system.is_empty()).then(|| system.join("\n\n"));
        (system, rest)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(
        &self,
        model_identifier: &str,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<String, LlmClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_api_key(&self.provider_name))?;

        let (system, messages) = Self::split_system(messages);
        let request_body = MessagesRequest {
            model: model_identifier,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(options.timeout)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| from_transport(e, options.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(from_status(status, &body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(LlmClientError::InvalidResponse(
                "no text content blocks".to_string(),
            ));
        }
        Ok(text)
    }
}
