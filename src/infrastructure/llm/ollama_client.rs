use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::ports::{InvocationOptions, LlmClient, LlmClientError};
use crate::domain::{ApiProvider, Message};

use super::http_error::{from_status, from_transport};

pub struct OllamaClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(client: Client, provider: &ApiProvider) -> Self {
        Self {
            client,
            base_url: provider.base_url(),
        }
    }

    fn options_for(options: &InvocationOptions) -> Option<OllamaOptions> {
        if options.temperature.is_none() && options.max_tokens.is_none() {
            return None;
        }
        Some(OllamaOptions {
            temperature: options.temperature,
            num_predict: options.max_tokens,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(
        &self,
        model_identifier: &str,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<String, LlmClientError> {
        let request_body = OllamaChatRequest {
            model: model_identifier,
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
            think: options.disable_thinking.then_some(false),
            options: Self::options_for(options),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
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

        let chat: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::InvalidResponse(e.to_string()))?;

        chat.message
            .map(|m| m.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmClientError::InvalidResponse("empty message".to_string()))
    }
}
