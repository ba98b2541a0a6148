use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use cyoa_server::application::ports::{InvocationOptions, LlmClient, LlmClientError};
use cyoa_server::domain::{ApiProvider, Message, ProviderKind};
use cyoa_server::infrastructure::llm::OpenAiCompatibleClient;
use serde_json::{Value, json};

use crate::helpers::{Captured, spawn_server};

fn endpoint(captured: Captured, status: StatusCode, reply: Value) -> Router {
    Router::new().route(
        "/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let captured = captured.clone();
            let reply = reply.clone();
            async move {
                captured.record(headers, body);
                (status, Json(reply))
            }
        }),
    )
}

fn client(base_url: String, api_key: Option<&str>) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::new(
        reqwest::Client::new(),
        &ApiProvider {
            name: "router".to_string(),
            kind: ProviderKind::OpenRouter,
            base_url: Some(base_url),
            api_key: api_key.map(String::from),
        },
    )
}

fn options() -> InvocationOptions {
    InvocationOptions::with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn given_successful_completion_when_calling_then_first_choice_returned() {
    let captured = Captured::default();
    let reply = json!({"choices": [{"message": {"role": "assistant", "content": "The cave glows."}}]});
    let base_url = spawn_server(endpoint(captured.clone(), StatusCode::OK, reply)).await;

    let text = client(base_url, Some("sk-test"))
        .complete(
            "mistral-small",
            &[Message::system("Narrate."), Message::user("I enter")],
            &options(),
        )
        .await
        .unwrap();

    assert_eq!(text, "The cave glows.");
    assert_eq!(captured.header("authorization").as_deref(), Some("Bearer sk-test"));
    let body = captured.body();
    assert_eq!(body["model"], "mistral-small");
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "I enter");
}

#[tokio::test]
async fn given_rate_limit_when_calling_then_transient_error() {
    let base_url = spawn_server(endpoint(
        Captured::default(),
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": "slow down"}),
    ))
    .await;

    let error = client(base_url, Some("sk-test"))
        .complete("m", &[Message::user("hi")], &options())
        .await
        .unwrap_err();

    assert!(matches!(error, LlmClientError::RateLimited));
}

#[tokio::test]
async fn given_rejected_key_when_calling_then_authentication_error() {
    let base_url = spawn_server(endpoint(
        Captured::default(),
        StatusCode::UNAUTHORIZED,
        json!({"error": "invalid key"}),
    ))
    .await;

    let error = client(base_url, Some("sk-wrong"))
        .complete("m", &[Message::user("hi")], &options())
        .await
        .unwrap_err();

    assert!(matches!(error, LlmClientError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn given_empty_choices_when_calling_then_invalid_response() {
    let base_url = spawn_server(endpoint(
        Captured::default(),
        StatusCode::OK,
        json!({"choices": []}),
    ))
    .await;

    let error = client(base_url, Some("sk-test"))
        .complete("m", &[Message::user("hi")], &options())
        .await
        .unwrap_err();

    assert!(matches!(error, LlmClientError::InvalidResponse(_)));
}

#[tokio::test]
async fn given_missing_api_key_when_calling_then_fails_before_request() {
    let captured = Captured::default();
    let base_url = spawn_server(endpoint(captured.clone(), StatusCode::OK, json!({}))).await;

    let error = client(base_url, None)
        .complete("m", &[Message::user("hi")], &options())
        .await
        .unwrap_err();

    assert!(matches!(error, LlmClientError::AuthenticationFailed(_)));
    assert!(!captured.was_called());
}

#[tokio::test]
async fn given_unreachable_host_when_calling_then_connection_failure() {
    let error = client("http://127.0.0.1:9".to_string(), Some("sk-test"))
        .complete("m", &[Message::user("hi")], &options())
        .await
        .unwrap_err();

    assert!(matches!(error, LlmClientError::ConnectionFailed(_)));
}
