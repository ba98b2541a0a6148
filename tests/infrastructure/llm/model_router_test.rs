use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::{Json, Router};
use cyoa_server::application::ports::{InvocationOptions, LlmClient, LlmClientError, LlmGateway};
use cyoa_server::domain::{ApiProvider, LlmModel, Message, ModelId, ProviderKind};
use cyoa_server::infrastructure::llm::ModelRouter;
use serde_json::{Value, json};

use crate::helpers::spawn_server;

struct EchoClient {
    delay: Duration,
}

#[async_trait::async_trait]
impl LlmClient for EchoClient {
    async fn complete(
        &self,
        model_identifier: &str,
        messages: &[Message],
        _options: &InvocationOptions,
    ) -> Result<String, LlmClientError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("{}:{}", model_identifier, messages.len()))
    }
}

fn local_model(id: &str, base_url: &str, available: bool) -> LlmModel {
    LlmModel {
        id: ModelId::new(id),
        model_identifier: format!("{}-tag", id),
        provider: ApiProvider {
            name: "local".to_string(),
            kind: ProviderKind::Ollama,
            base_url: Some(base_url.to_string()),
            api_key: None,
        },
        available,
    }
}

fn options(timeout: Duration) -> InvocationOptions {
    InvocationOptions::with_timeout(timeout)
}

#[tokio::test]
async fn given_registered_model_when_invoking_then_provider_identifier_used() {
    let router = ModelRouter::from_models(&[], Duration::from_secs(1))
        .unwrap()
        .with_client(
            ModelId::new("storyteller"),
            "story-model",
            Arc::new(EchoClient {
                delay: Duration::ZERO,
            }),
        );

    let text = router
        .invoke(
            &ModelId::new("storyteller"),
            &[Message::user("go")],
            &options(Duration::from_secs(1)),
        )
        .await
        .unwrap();

    assert_eq!(text, "story-model:1");
}

#[tokio::test]
async fn given_unknown_model_when_invoking_then_model_error() {
    let router = ModelRouter::from_models(&[], Duration::from_secs(1)).unwrap();

    let error = router
        .invoke(
            &ModelId::new("ghost"),
            &[Message::user("go")],
            &options(Duration::from_secs(1)),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, LlmClientError::UnknownModel(id) if id == "ghost"));
}

#[tokio::test]
async fn given_slow_provider_when_deadline_passes_then_timeout() {
    let router = ModelRouter::from_models(&[], Duration::from_secs(1))
        .unwrap()
        .with_client(
            ModelId::new("slow"),
            "slow-model",
            Arc::new(EchoClient {
                delay: Duration::from_secs(5),
            }),
        );

    let error = router
        .invoke(
            &ModelId::new("slow"),
            &[Message::user("go")],
            &options(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, LlmClientError::Timeout(_)));
}

#[tokio::test]
async fn given_catalog_models_when_routing_then_only_available_models_reachable() {
    let server = Router::new().route(
        "/api/chat",
        post(|Json(body): Json<Value>| async move {
            let model = body["model"].as_str().unwrap_or_default().to_string();
            Json(json!({"message": {"role": "assistant", "content": format!("served {}", model)}}))
        }),
    );
    let base_url = spawn_server(server).await;
    let router = ModelRouter::from_models(
        &[
            local_model("judge", &base_url, true),
            local_model("retired", &base_url, false),
        ],
        Duration::from_secs(1),
    )
    .unwrap();

    let served = router
        .invoke(
            &ModelId::new("judge"),
            &[Message::user("check")],
            &options(Duration::from_secs(5)),
        )
        .await
        .unwrap();
    let retired = router
        .invoke(
            &ModelId::new("retired"),
            &[Message::user("check")],
            &options(Duration::from_secs(5)),
        )
        .await;

    assert_eq!(served, "served judge-tag");
    assert!(matches!(retired, Err(LlmClientError::UnknownModel(_))));
}
