use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    activate_configuration_handler, active_configuration_handler, audit_entry_handler,
    chat_completions_handler, discard_handler, health_handler, models_handler,
    recent_audit_handler, recording_status_handler, transcribe_handler, upload_handler,
};
use crate::presentation::state::AppState;

/// Multipart framing on top of the audio payload itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let upload_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/models", get(models_handler))
        .route("/api/models", get(models_handler))
        .route("/v1/chat/completions", post(chat_completions_handler))
        .route("/api/chat/completions", post(chat_completions_handler))
        .route(
            "/api/stt/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/stt/transcribe", post(transcribe_handler))
        .route(
            "/api/stt/recording/{recording_id}",
            get(recording_status_handler),
        )
        .route("/api/stt/discard", post(discard_handler))
        .route("/api/v1/audit", get(recent_audit_handler))
        .route("/api/v1/audit/{audit_id}", get(audit_entry_handler))
        .route("/api/v1/configuration", get(active_configuration_handler))
        .route(
            "/api/v1/configurations/{configuration_id}/activate",
            post(activate_configuration_handler),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
