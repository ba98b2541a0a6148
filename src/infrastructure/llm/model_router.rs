use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::instrument;

use crate::application::ports::{InvocationOptions, LlmClient, LlmClientError, LlmGateway};
use crate::domain::{ApiProvider, LlmModel, Message, ModelId, ProviderKind};

use super::{AnthropicClient, OllamaClient, OpenAiCompatibleClient};

struct Route {
    model_identifier: String,
    provider: String,
    client: Arc<dyn LlmClient>,
}

/// Resolves registry ids to provider clients and enforces the per-call deadline.
pub struct ModelRouter {
    routes: HashMap<ModelId, Route>,
}

impl ModelRouter {
    pub fn from_models(models: &[LlmModel], connect_timeout: Duration) -> Result<Self, LlmClientError> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| LlmClientError::ConnectionFailed(e.to_string()))?;

        let mut clients: HashMap<String, Arc<dyn LlmClient>> = HashMap::new();
        let mut routes = HashMap::new();
        for model in models.iter().filter(|m| m.available) {
            if model.provider.kind.requires_api_key() && model.provider.api_key.is_none() {
                tracing::warn!(
                    model = %model.id,
                    provider = %model.provider.name,
                    "Provider has no API key; calls will fail with an auth error"
                );
            }
            let client = clients
                .entry(model.provider.name.clone())
                .or_insert_with(|| client_for(http.clone(), &model.provider))
                .clone();
            routes.insert(
                model.id.clone(),
                Route {
                    model_identifier: model.model_identifier.clone(),
                    provider: model.provider.name.clone(),
                    client,
                },
            );
        }

        tracing::info!(models = routes.len(), providers = clients.len(), "Model router ready");
        Ok(Self { routes })
    }

    pub fn with_client(
        mut self,
        id: ModelId,
        model_identifier: impl Into<String>,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        self.routes.insert(
            id,
            Route {
                model_identifier: model_identifier.into(),
                provider: "custom".to_string(),
                client,
            },
        );
        self
    }
}

fn client_for(http: Client, provider: &ApiProvider) -> Arc<dyn LlmClient> {
    match provider.kind {
        ProviderKind::Ollama => Arc::new(OllamaClient::new(http, provider)),
        ProviderKind::OpenAi | ProviderKind::OpenRouter => {
            Arc::new(OpenAiCompatibleClient::new(http, provider))
        }
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(http, provider)),
    }
}

#[async_trait]
impl LlmGateway for ModelRouter {
    #[instrument(skip(self, messages, options), fields(model = %model, provider, messages = messages.len()))]
    async fn invoke(
        &self,
        model: &ModelId,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<String, LlmClientError> {
        let route = self
            .routes
            .get(model)
            .ok_or_else(|| LlmClientError::UnknownModel(model.to_string()))?;
        tracing::Span::current().record("provider", route.provider.as_str());

        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            options.timeout,
            route
                .client
                .complete(&route.model_identifier, messages, options),
        )
        .await
        .unwrap_or(Err(LlmClientError::Timeout(options.timeout)));

        match &result {
            Ok(text) => tracing::debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                chars = text.len(),
                "Model call completed"
            ),
            Err(e) => tracing::warn!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                kind = %e.kind(),
                error = %e,
                "Model call failed"
            ),
        }
        result
    }
}
