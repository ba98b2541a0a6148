use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::application::services::SttError;
use crate::domain::{Recording, RecordingId};
use crate::presentation::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordingRequest {
    #[serde(default)]
    pub recording_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub recording_id: String,
    pub status: String,
    pub size_bytes: u64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&Recording> for RecordingResponse {
    fn from(recording: &Recording) -> Self {
        Self {
            recording_id: recording.id.as_uuid().to_string(),
            status: recording.status.as_str().to_string(),
            size_bytes: recording.size_bytes,
            created_at: recording.created_at.to_rfc3339(),
            transcript: recording.transcript.clone(),
            error: recording.error_text.clone(),
            message: None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_id: Option<String>,
}

fn error_response(status: StatusCode, error: impl Into<String>, recording_id: Option<RecordingId>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            recording_id: recording_id.map(|id| id.as_uuid().to_string()),
        }),
    )
        .into_response()
}

fn parse_recording_id(raw: Option<&str>) -> Result<RecordingId, Response> {
    let raw = raw
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "recording_id is required", None))?;
    RecordingId::parse(raw).map_err(|e| error_response(StatusCode::BAD_REQUEST, e, None))
}

fn stt_error_response(error: SttError, id: RecordingId) -> Response {
    match error {
        SttError::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "Recording not found", Some(id))
        }
        SttError::Transcription(e) => {
            tracing::warn!(error = %e, "Transcription backend failed");
            error_response(
                StatusCode::BAD_GATEWAY,
                format!("Transcription failed: {}", e),
                Some(id),
            )
        }
        other => {
            tracing::error!(error = %other, "Speech-to-text request failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Speech-to-text request failed",
                Some(id),
            )
        }
    }
}

/// Multipart upload: an `audio` file part and an optional `recording_id` idempotency key.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut recording_id: Option<String> = None;
    let mut audio: Option<(String, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read multipart");
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read multipart: {}", e),
                    None,
                );
            }
        };

        match field.name().unwrap_or_default() {
            "recording_id" => match field.text().await {
                Ok(text) => recording_id = Some(text),
                Err(e) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read recording_id: {}", e),
                        None,
                    );
                }
            },
            "audio" => {
                let mime_type = field.content_type().unwrap_or("audio/webm").to_string();
                match field.bytes().await {
                    Ok(bytes) => audio = Some((mime_type, bytes)),
                    Err(e) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read audio: {}", e),
                            None,
                        );
                    }
                }
            }
            _ => {}
        }
    }

    let id = match recording_id.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => match RecordingId::parse(raw) {
            Ok(id) => Some(id),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e, None),
        },
        None => None,
    };

    let Some((mime_type, bytes)) = audio.filter(|(_, bytes)| !bytes.is_empty()) else {
        tracing::warn!("Upload request without audio");
        return error_response(StatusCode::BAD_REQUEST, "No audio file uploaded", id);
    };
    if bytes.len() > state.max_upload_bytes {
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Audio exceeds {} bytes", state.max_upload_bytes),
            id,
        );
    }

    tracing::debug!(mime_type = %mime_type, bytes = bytes.len(), "Audio received");

    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(bytes) }).boxed();
    match state
        .transcription_service
        .upload(id, &mime_type, stream)
        .await
    {
        Ok(outcome) => {
            let mut response = RecordingResponse::from(&outcome.recording);
            let (status, message) = if outcome.already_existed {
                (StatusCode::OK, "Recording already exists")
            } else {
                (StatusCode::CREATED, "Recording uploaded")
            };
            response.message = Some(message.to_string());
            (status, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to store recording");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store recording", id)
        }
    }
}

/// Safe to retry: a transcribed recording answers from its stored transcript.
#[tracing::instrument(skip(state, request))]
pub async fn transcribe_handler(
    State(state): State<AppState>,
    Json(request): Json<RecordingRequest>,
) -> Response {
    let id = match parse_recording_id(request.recording_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.transcription_service.transcribe(id).await {
        Ok(recording) => (StatusCode::OK, Json(RecordingResponse::from(&recording))).into_response(),
        Err(e) => stt_error_response(e, id),
    }
}

#[tracing::instrument(skip(state))]
pub async fn recording_status_handler(
    State(state): State<AppState>,
    Path(recording_id): Path<String>,
) -> Response {
    let id = match parse_recording_id(Some(&recording_id)) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.transcription_service.status(id).await {
        Ok(recording) => (StatusCode::OK, Json(RecordingResponse::from(&recording))).into_response(),
        Err(e) => stt_error_response(e, id),
    }
}

#[derive(Debug, Serialize)]
pub struct DiscardResponse {
    pub recording_id: String,
    pub discarded: bool,
}

#[tracing::instrument(skip(state, request))]
pub async fn discard_handler(
    State(state): State<AppState>,
    Json(request): Json<RecordingRequest>,
) -> Response {
    let id = match parse_recording_id(request.recording_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.transcription_service.discard(id).await {
        Ok(discarded) => (
            StatusCode::OK,
            Json(DiscardResponse {
                recording_id: id.as_uuid().to_string(),
                discarded,
            }),
        )
            .into_response(),
        Err(e) => stt_error_response(e, id),
    }
}
