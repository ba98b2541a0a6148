mod catalog_configuration_store;
mod in_memory_repositories;
mod pg_audit_log_repository;
mod pg_game_session_repository;
mod pg_pool;
mod pg_recording_repository;

pub use catalog_configuration_store::{
    Catalog, CatalogConfigurationStore, DEFAULT_JUDGE_INSTRUCTION,
    DEFAULT_REFUSAL_CLASSIFIER_PROMPT, DEFAULT_REFUSAL_QUESTION,
};
pub use in_memory_repositories::{
    InMemoryAuditLogRepository, InMemoryGameSessionRepository, InMemoryRecordingRepository,
};
pub use pg_audit_log_repository::PgAuditLogRepository;
pub use pg_game_session_repository::PgGameSessionRepository;
pub use pg_pool::{create_pool, run_migrations};
pub use pg_recording_repository::PgRecordingRepository;
