use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const SESSION_ID_LENGTH: usize = 16;

/// Short hex identifier of one game conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        let seed = format!(
            "{}:{}",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            uuid::Uuid::new_v4()
        );
        Self(short_digest(&seed))
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid session id: {}", raw));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of the opening exchange, used to find a session once its marker is gone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationFingerprint(String);

impl ConversationFingerprint {
    const PREFIX_CHARS: usize = 200;

    pub fn from_opening(first_user: &str, first_assistant: &str) -> Self {
        let user: String = first_user.chars().take(Self::PREFIX_CHARS).collect();
        let assistant: String = first_assistant.chars().take(Self::PREFIX_CHARS).collect();
        Self(short_digest(&format!("{}|{}", user, assistant)))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn short_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(SESSION_ID_LENGTH);
    encoded
}
