mod audit_log;
mod configuration;
mod difficulty;
mod failure_kind;
mod game_session;
mod judge_step;
mod llm_model;
mod message;
mod message_role;
mod pacing;
mod play_mode;
mod prompt;
mod recording;
mod recording_status;
mod session_id;
mod storage_path;
mod validation_error;
mod verdict;

pub use audit_log::{AuditLogEntry, AuditLogId, StageFailure, TurnStage};
pub use configuration::{ConfigurationId, GameConfiguration, RefusalSettings};
pub use difficulty::DifficultyProfile;
pub use failure_kind::{Failure, FailureKind};
pub use game_session::GameSession;
pub use judge_step::{JudgeStepConfig, JudgeStepKind, JudgeStepRecord};
pub use llm_model::{ApiProvider, LlmModel, ModelId, ProviderKind};
pub use message::Message;
pub use message_role::MessageRole;
pub use pacing::{Pacing, PacingDictionary, SUPPORTED_TOTAL_TURNS};
pub use play_mode::{MODERATED_MODEL, PlayMode, STORYTELLER_ONLY_MODEL, TEST_MODEL};
pub use prompt::{Prompt, PromptKind};
pub use recording::{Recording, RecordingId, audio_extension};
pub use recording_status::RecordingStatus;
pub use session_id::{ConversationFingerprint, SessionId};
pub use storage_path::StoragePath;
pub use validation_error::ValidationError;
pub use verdict::Verdict;
