use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{ConversationFingerprint, Message, MessageRole, SessionId};

static FOOTNOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n*\[\^s\]:\s*#\s*\(([a-fA-F0-9]+)\)").expect("valid footnote marker pattern")
});
static COMMENT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*CYOA_SESSION:\s*([a-fA-F0-9]+)\s*-->").expect("valid comment marker pattern")
});
static TAG_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<CYOA_SESSION_ID:\s*([a-fA-F0-9]+)\s*>").expect("valid tag marker pattern")
});

/// A client transcript reduced to what the storyteller should see.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedConversation {
    /// User and assistant messages before the current action, markers removed.
    pub history: Vec<Message>,
    pub action: String,
    pub session_id: Option<SessionId>,
    pub fingerprint: Option<ConversationFingerprint>,
    pub turn_number: u32,
}

impl PreparedConversation {
    /// History followed by the action as the final user message.
    pub fn transcript(&self) -> Vec<Message> {
        let mut messages = self.history.clone();
        messages.push(Message::user(self.action.clone()));
        messages
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationInputError {
    #[error("No user message provided")]
    NoUserMessage,
    #[error("The last message must be the player's action")]
    ActionNotLast,
}

pub fn prepare_conversation(messages: &[Message]) -> Result<PreparedConversation, ConversationInputError> {
    let session_id = extract_session_id(messages);

    let mut dialogue: Vec<Message> = messages
        .iter()
        .filter(|message| message.role != MessageRole::System)
        .map(|message| Message::new(message.role, strip_session_markers(&message.content)))
        .collect();

    let turn_number = dialogue
        .iter()
        .filter(|message| message.role == MessageRole::User)
        .count() as u32;

    let action = match dialogue.pop() {
        Some(last) if last.role == MessageRole::User => last.content,
        Some(_) => return Err(ConversationInputError::ActionNotLast),
        None => return Err(ConversationInputError::NoUserMessage),
    };
    if action.trim().is_empty() {
        return Err(ConversationInputError::NoUserMessage);
    }

    let fingerprint = conversation_fingerprint(&dialogue);

    Ok(PreparedConversation {
        history: dialogue,
        action,
        session_id,
        fingerprint,
        turn_number,
    })
}

pub fn extract_session_id(messages: &[Message]) -> Option<SessionId> {
    messages.iter().find_map(|message| {
        [&*FOOTNOTE_MARKER, &*COMMENT_MARKER, &*TAG_MARKER]
            .iter()
            .find_map(|pattern| pattern.captures(&message.content))
            .and_then(|captures| captures.get(1))
            .and_then(|id| SessionId::parse(id.as_str()).ok())
    })
}

pub fn strip_session_markers(text: &str) -> String {
    let text = FOOTNOTE_MARKER.replace_all(text, "");
    let text = COMMENT_MARKER.replace_all(&text, "");
    let text = TAG_MARKER.replace_all(&text, "");
    text.trim_end().to_string()
}

pub fn append_session_marker(text: &str, session_id: &SessionId) -> String {
    format!("{}\n\n[^s]: # ({})", text, session_id)
}

fn conversation_fingerprint(dialogue: &[Message]) -> Option<ConversationFingerprint> {
    let first_user = dialogue.iter().find(|m| m.role == MessageRole::User)?;
    let first_assistant = dialogue.iter().find(|m| m.role == MessageRole::Assistant)?;
    Some(ConversationFingerprint::from_opening(
        &first_user.content,
        &first_assistant.content,
    ))
}
