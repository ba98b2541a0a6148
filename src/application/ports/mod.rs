mod audio_store;
mod audit_log_repository;
mod configuration_store;
mod game_session_repository;
mod llm_client;
mod llm_gateway;
mod recording_repository;
mod repository_error;
mod transcription_engine;

pub use audio_store::{AudioStore, AudioStoreError};
pub use audit_log_repository::AuditLogRepository;
pub use configuration_store::{ConfigurationError, ConfigurationStore};
pub use game_session_repository::GameSessionRepository;
pub use llm_client::{InvocationOptions, LlmClient, LlmClientError};
pub use llm_gateway::LlmGateway;
pub use recording_repository::RecordingRepository;
pub use repository_error::RepositoryError;
pub use transcription_engine::{TranscriptionEngine, TranscriptionError};
