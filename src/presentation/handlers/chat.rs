use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::stream;
use tracing::Instrument;

use crate::application::services::{TurnError, TurnRequest};
use crate::domain::{FailureKind, Message, MessageRole, PlayMode};
use crate::infrastructure::observability::sanitize_prompt;
use crate::presentation::state::AppState;

use super::openai_types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ErrorResponse,
};

pub const AUDIT_ID_HEADER: &str = "x-audit-id";

fn to_domain(messages: &[ChatMessage]) -> Result<Vec<Message>, String> {
    messages
        .iter()
        .map(|m| {
            let role = m.role.parse::<MessageRole>()?;
            Ok(Message::new(role, m.content.to_text()))
        })
        .collect()
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, "invalid_request_error", None)),
    )
        .into_response()
}

#[tracing::instrument(
    skip(state, request),
    fields(model = %request.model, streaming = ?request.stream)
)]
pub async fn chat_completions_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    let mode = PlayMode::from_model_name(&request.model);

    let messages = match to_domain(&request.messages) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(error = %e, "Chat completion request with unknown role");
            return bad_request(e);
        }
    };

    if let Some(action) = messages.iter().rev().find(|m| m.role == MessageRole::User) {
        tracing::debug!(mode = %mode, action = %sanitize_prompt(&action.content), "Processing player action");
    }

    // Detached so a client disconnect cannot cut a turn (and its audit entry) short.
    let orchestrator = Arc::clone(&state.orchestrator);
    let turn = tokio::spawn(
        async move { orchestrator.play_turn(TurnRequest { mode, messages }).await }
            .instrument(tracing::Span::current()),
    )
    .await;

    let outcome = match turn {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(TurnError::InvalidConversation(e))) => {
            tracing::warn!(error = %e, "Rejected conversation");
            return bad_request(e.to_string());
        }
        Ok(Err(e)) => return turn_failure_response(&e),
        Err(e) => {
            tracing::error!(error = %e, "Turn task aborted");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "The story could not be continued. Please try again.",
                    "api_error",
                    None,
                )),
            )
                .into_response();
        }
    };

    let audit_id = outcome.audit_id.as_uuid().to_string();
    tracing::info!(
        audit_id = %audit_id,
        was_refusal = outcome.was_refusal,
        was_modified = outcome.was_modified,
        game_ending = outcome.game_ending,
        "Chat completion successful"
    );

    if request.stream == Some(true) {
        return create_streaming_response(&request.model, &outcome.final_turn, &audit_id);
    }

    (
        StatusCode::OK,
        [(HeaderName::from_static(AUDIT_ID_HEADER), audit_id)],
        Json(ChatCompletionResponse::new(request.model, outcome.final_turn)),
    )
        .into_response()
}

/// Player-facing failure: no internals, only the reference an operator can look up.
fn turn_failure_response(error: &TurnError) -> Response {
    let audit_id = error.audit_id().map(|id| id.as_uuid().to_string());
    tracing::error!(error = %error, audit_id = ?audit_id, "Turn failed");

    let status = match error {
        TurnError::Configuration { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TurnError::Storyteller { failure, .. } if failure.kind == FailureKind::Transient => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::BAD_GATEWAY,
    };
    let message = match &audit_id {
        Some(id) => format!(
            "The story could not be continued right now. Please try again. (reference: {})",
            id
        ),
        None => "The story could not be continued right now. Please try again.".to_string(),
    };

    let mut response = (
        status,
        Json(ErrorResponse::new(message, "api_error", audit_id.clone())),
    )
        .into_response();
    if let Some(value) = audit_id.and_then(|id| id.parse().ok()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(AUDIT_ID_HEADER), value);
    }
    response
}

/// Replays a finished turn as OpenAI stream chunks, one word at a time.
fn create_streaming_response(model: &str, content: &str, audit_id: &str) -> Response {
    let id = format!("chatcmpl-{}", uuid::Uuid::new_v4());
    let encode = |chunk: &ChatCompletionChunk| {
        format!("data: {}\n\n", serde_json::to_string(chunk).unwrap_or_default())
    };

    let mut events = vec![encode(&ChatCompletionChunk::new_start(&id, model))];
    events.extend(
        content
            .split_inclusive(' ')
            .map(|word| encode(&ChatCompletionChunk::new_content(&id, model, word))),
    );
    events.push(encode(&ChatCompletionChunk::new_done(&id, model)));
    events.push("data: [DONE]\n\n".to_string());

    let body = Body::from_stream(stream::iter(
        events.into_iter().map(Ok::<_, std::convert::Infallible>),
    ));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (HeaderName::from_static(AUDIT_ID_HEADER), audit_id.to_string()),
        ],
        body,
    )
        .into_response()
}
