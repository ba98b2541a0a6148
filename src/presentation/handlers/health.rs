use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_configuration: Option<String>,
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let active = state.configuration_store.active_snapshot().await.ok();
    let status = if active.is_some() { "healthy" } else { "degraded" };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status,
            active_configuration: active.map(|c| c.id.to_string()),
        }),
    )
}
