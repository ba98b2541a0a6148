use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{RecordingStatus, StoragePath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordingId(Uuid);

impl RecordingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| format!("Invalid recording ID format: {}", raw))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordingId {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-side copy of one uploaded voice clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub id: RecordingId,
    pub storage_path: StoragePath,
    pub mime_type: String,
    pub size_bytes: u64,
    pub status: RecordingStatus,
    pub transcript: Option<String>,
    pub error_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recording {
    pub fn new(id: RecordingId, storage_path: StoragePath, mime_type: String, size_bytes: u64) -> Self {
        let now = Utc::now();
        Self {
            id,
            storage_path,
            mime_type,
            size_bytes,
            status: RecordingStatus::Uploaded,
            transcript: None,
            error_text: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == RecordingStatus::Deleted
    }

    pub fn cached_transcript(&self) -> Option<&str> {
        match self.status {
            RecordingStatus::Transcribed => self.transcript.as_deref(),
            _ => None,
        }
    }

    pub fn transition(&mut self, status: RecordingStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// File extension for an uploaded clip, from its mime type.
pub fn audio_extension(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    match essence.as_str() {
        "audio/webm" => "webm",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        _ => "webm",
    }
}
