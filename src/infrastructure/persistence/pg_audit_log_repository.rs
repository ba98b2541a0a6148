use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{AuditLogRepository, RepositoryError};
use crate::domain::{AuditLogEntry, AuditLogId};

/// Stores each entry as one JSONB document plus a few indexed columns.
pub struct PgAuditLogRepository {
    pool: PgPool,
}

impl PgAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode(value: serde_json::Value) -> Result<AuditLogEntry, RepositoryError> {
    serde_json::from_value(value).map_err(|e| RepositoryError::CorruptRecord(e.to_string()))
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    #[instrument(skip(self, entry), fields(audit_id = %entry.id.as_uuid()))]
    async fn record(&self, entry: &AuditLogEntry) -> Result<(), RepositoryError> {
        let document = serde_json::to_value(entry)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, session_id, configuration_id, mode, turn_number,
                                    was_refusal, was_modified, game_ending, entry, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET entry = EXCLUDED.entry
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.session_id.as_ref().map(|s| s.as_str().to_string()))
        .bind(entry.configuration_id.as_ref().map(|c| c.as_str().to_string()))
        .bind(entry.mode.as_str())
        .bind(entry.turn_number as i32)
        .bind(entry.was_refusal)
        .bind(entry.was_modified)
        .bind(entry.game_ending)
        .bind(document)
        .bind(entry.started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(audit_id = %id.as_uuid()))]
    async fn get_by_id(&self, id: AuditLogId) -> Result<Option<AuditLogEntry>, RepositoryError> {
        let row = sqlx::query("SELECT entry FROM audit_logs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.map(|r| {
            r.try_get::<serde_json::Value, _>("entry")
                .map_err(|e| RepositoryError::CorruptRecord(e.to_string()))
                .and_then(decode)
        })
        .transpose()
    }

    #[instrument(skip(self))]
    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let rows = sqlx::query("SELECT entry FROM audit_logs ORDER BY created_at DESC LIMIT $1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.into_iter()
            .map(|r| {
                r.try_get::<serde_json::Value, _>("entry")
                    .map_err(|e| RepositoryError::CorruptRecord(e.to_string()))
                    .and_then(decode)
            })
            .collect()
    }
}
