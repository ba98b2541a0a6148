use std::fmt;

use super::RecordingId;

const RECORDINGS_PREFIX: &str = "stt_recordings";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath(String);

impl StoragePath {
    pub fn for_recording(recording_id: &RecordingId, extension: &str) -> Self {
        Self(format!(
            "{}/{}.{}",
            RECORDINGS_PREFIX,
            recording_id.as_uuid(),
            extension
        ))
    }

    pub fn from_raw(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
