use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::ports::ConfigurationError;
use crate::domain::{ConfigurationId, GameConfiguration};
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct ActiveConfigurationResponse {
    pub id: String,
    pub name: String,
    pub storyteller_model: String,
    pub judge_model: String,
    pub total_turns: u32,
    pub phase_turns: [u32; 4],
    pub judge_steps: Vec<String>,
    pub difficulty: Option<String>,
    pub refusal_check: bool,
}

impl From<&GameConfiguration> for ActiveConfigurationResponse {
    fn from(configuration: &GameConfiguration) -> Self {
        Self {
            id: configuration.id.to_string(),
            name: configuration.name.clone(),
            storyteller_model: configuration.storyteller_model.to_string(),
            judge_model: configuration.judge_model.to_string(),
            total_turns: configuration.pacing.total_turns(),
            phase_turns: configuration.pacing.phase_turns(),
            judge_steps: configuration
                .enabled_judge_steps()
                .map(|step| format!("{} ({})", step.name, step.kind))
                .collect(),
            difficulty: configuration.difficulty.as_ref().map(|d| d.name().to_string()),
            refusal_check: configuration.refusal.is_some(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn configuration_error(error: ConfigurationError) -> Response {
    let status = match &error {
        ConfigurationError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ConfigurationError::NoActiveConfiguration => StatusCode::SERVICE_UNAVAILABLE,
        ConfigurationError::LoadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn active_configuration_handler(State(state): State<AppState>) -> Response {
    match state.configuration_store.active_snapshot().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ActiveConfigurationResponse::from(snapshot.as_ref())),
        )
            .into_response(),
        Err(e) => configuration_error(e),
    }
}

#[tracing::instrument(skip(state))]
pub async fn activate_configuration_handler(
    State(state): State<AppState>,
    Path(configuration_id): Path<String>,
) -> Response {
    let id = ConfigurationId::new(configuration_id);
    if let Err(e) = state.configuration_store.activate(&id).await {
        tracing::warn!(error = %e, "Configuration activation rejected");
        return configuration_error(e);
    }
    active_configuration_handler(State(state)).await
}
