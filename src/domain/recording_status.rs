use std::fmt;
use std::str::FromStr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    Uploaded,
    Processing,
    Transcribed,
    Failed,
    Deleted,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Uploaded => "uploaded",
            RecordingStatus::Processing => "processing",
            RecordingStatus::Transcribed => "transcribed",
            RecordingStatus::Failed => "failed",
            RecordingStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for RecordingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(RecordingStatus::Uploaded),
            "processing" => Ok(RecordingStatus::Processing),
            "transcribed" => Ok(RecordingStatus::Transcribed),
            "failed" => Ok(RecordingStatus::Failed),
            "deleted" => Ok(RecordingStatus::Deleted),
            _ => Err(format!("Invalid recording status: {}", s)),
        }
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
