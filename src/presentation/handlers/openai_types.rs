use serde::{Deserialize, Serialize};

use crate::domain::{LlmModel, MODERATED_MODEL, STORYTELLER_ONLY_MODEL, TEST_MODEL};

pub const GAME_SERVER_OWNER: &str = "cyoa-game-server";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: MessageContent,
}

/// Plain string content or the multi-part array some clients send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl MessageContent {
    pub fn to_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| p.kind == "text")
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub object: &'static str,
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub owned_by: String,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl ChatCompletionResponse {
    pub fn new(model: String, content: String) -> Self {
        // Rough token estimate; clients only display it.
        let completion_tokens = content.split_whitespace().count() as u32;
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
            object: "chat.completion",
            created: unix_now(),
            model,
            choices: vec![ChatChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant",
                    content,
                },
                finish_reason: "stop".to_string(),
            }],
            usage: Usage {
                prompt_tokens: 0,
                completion_tokens,
                total_tokens: completion_tokens,
            },
        }
    }
}

impl ModelsResponse {
    /// The three play modes first, then every available registered model.
    pub fn for_play_modes(registered: &[LlmModel]) -> Self {
        let created = unix_now();
        let modes = [MODERATED_MODEL, STORYTELLER_ONLY_MODEL, TEST_MODEL]
            .into_iter()
            .map(|id| ModelInfo {
                id: id.to_string(),
                object: "model",
                created,
                owned_by: GAME_SERVER_OWNER.to_string(),
            });
        let models = registered
            .iter()
            .filter(|m| m.available)
            .map(|m| ModelInfo {
                id: m.id.to_string(),
                object: "model",
                created,
                owned_by: m.provider.kind.as_str().to_string(),
            });
        Self {
            object: "list",
            data: modes.chain(models).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    fn with_delta(id: &str, model: &str, delta: ChunkDelta, finish_reason: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk",
            created: unix_now(),
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason: finish_reason.map(String::from),
            }],
        }
    }

    pub fn new_start(id: &str, model: &str) -> Self {
        let delta = ChunkDelta {
            role: Some("assistant".to_string()),
            content: None,
        };
        Self::with_delta(id, model, delta, None)
    }

    pub fn new_content(id: &str, model: &str, content: &str) -> Self {
        let delta = ChunkDelta {
            role: None,
            content: Some(content.to_string()),
        };
        Self::with_delta(id, model, delta, None)
    }

    pub fn new_done(id: &str, model: &str) -> Self {
        Self::with_delta(id, model, ChunkDelta::default(), Some("stop"))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ChatError,
}

#[derive(Debug, Serialize)]
pub struct ChatError {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, kind: &str, audit_id: Option<String>) -> Self {
        Self {
            error: ChatError {
                message: message.into(),
                r#type: kind.to_string(),
                audit_id,
            },
        }
    }
}
