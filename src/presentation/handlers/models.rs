use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::presentation::state::AppState;

use super::openai_types::ModelsResponse;

#[tracing::instrument(skip(state))]
pub async fn models_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registered = match state.configuration_store.registered_models().await {
        Ok(models) => models,
        Err(e) => {
            tracing::warn!(error = %e, "Model registry unavailable, listing play modes only");
            Vec::new()
        }
    };
    (StatusCode::OK, Json(ModelsResponse::for_play_modes(&registered)))
}
