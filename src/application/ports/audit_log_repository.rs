use async_trait::async_trait;

use crate::domain::{AuditLogEntry, AuditLogId};

use super::RepositoryError;

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn record(&self, entry: &AuditLogEntry) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: AuditLogId) -> Result<Option<AuditLogEntry>, RepositoryError>;

    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, RepositoryError>;
}
