use std::sync::Arc;

use crate::application::ports::{AuditLogRepository, ConfigurationStore};
use crate::application::services::{TranscriptionService, TurnOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub transcription_service: Arc<TranscriptionService>,
    pub configuration_store: Arc<dyn ConfigurationStore>,
    pub audit_log: Arc<dyn AuditLogRepository>,
    pub max_upload_bytes: usize,
}
