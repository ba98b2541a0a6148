use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    ConfigurationId, Failure, FailureKind, JudgeStepRecord, Message, PlayMode, SessionId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLogId(Uuid);

impl AuditLogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AuditLogId {
    fn default() -> Self {
        Self::new()
    }
}

/// Where in a turn an unrecoverable failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    Configuration,
    Storyteller,
    RefusalCheck,
    RefusalCorrection,
    Judge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: TurnStage,
    /// Absent when the failure did not come from a model invocation.
    pub kind: Option<FailureKind>,
    pub message: String,
}

/// Execution trace of one orchestrated turn. Written once, partial traces included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditLogId,
    pub session_id: Option<SessionId>,
    pub configuration_id: Option<ConfigurationId>,
    pub mode: PlayMode,
    pub turn_number: u32,
    pub request_messages: Vec<Message>,
    pub storyteller_output: Option<String>,
    pub final_turn: Option<String>,
    pub was_refusal: bool,
    pub refusal_classifier_response: Option<String>,
    pub was_corrected: bool,
    pub was_modified: bool,
    pub game_ending: bool,
    pub steps: Vec<JudgeStepRecord>,
    pub failures: Vec<StageFailure>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn begin(mode: PlayMode, request_messages: Vec<Message>) -> Self {
        let now = Utc::now();
        Self {
            id: AuditLogId::new(),
            session_id: None,
            configuration_id: None,
            mode,
            turn_number: 0,
            request_messages,
            storyteller_output: None,
            final_turn: None,
            was_refusal: false,
            refusal_classifier_response: None,
            was_corrected: false,
            was_modified: false,
            game_ending: false,
            steps: Vec::new(),
            failures: Vec::new(),
            started_at: now,
            completed_at: now,
        }
    }

    pub fn record_failure(&mut self, stage: TurnStage, failure: &Failure) {
        self.failures.push(StageFailure {
            stage,
            kind: Some(failure.kind),
            message: failure.message.clone(),
        });
    }

    pub fn record_error(&mut self, stage: TurnStage, message: impl Into<String>) {
        self.failures.push(StageFailure {
            stage,
            kind: None,
            message: message.into(),
        });
    }

    pub fn finish(mut self) -> Self {
        self.completed_at = Utc::now();
        self
    }
}
