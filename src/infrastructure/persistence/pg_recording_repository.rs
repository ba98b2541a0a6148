use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{RecordingRepository, RepositoryError};
use crate::domain::{Recording, RecordingId, RecordingStatus, StoragePath};

pub struct PgRecordingRepository {
    pool: PgPool,
}

impl PgRecordingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_row(row: PgRow) -> Result<Recording, RepositoryError> {
    let corrupt = |e: sqlx::Error| RepositoryError::CorruptRecord(e.to_string());

    let status: String = row.try_get("status").map_err(corrupt)?;
    let storage_path: String = row.try_get("storage_path").map_err(corrupt)?;
    let size_bytes: i64 = row.try_get("size_bytes").map_err(corrupt)?;

    Ok(Recording {
        id: RecordingId::from_uuid(row.try_get("id").map_err(corrupt)?),
        storage_path: StoragePath::from_raw(storage_path),
        mime_type: row.try_get("mime_type").map_err(corrupt)?,
        size_bytes: size_bytes.max(0) as u64,
        status: status
            .parse::<RecordingStatus>()
            .map_err(RepositoryError::CorruptRecord)?,
        transcript: row.try_get("transcript").map_err(corrupt)?,
        error_text: row.try_get("error_text").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

#[async_trait]
impl RecordingRepository for PgRecordingRepository {
    #[instrument(skip(self, recording), fields(recording_id = %recording.id.as_uuid()))]
    async fn create(&self, recording: &Recording) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO stt_recordings (id, storage_path, mime_type, size_bytes, status,
                                        transcript, error_text, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                storage_path = EXCLUDED.storage_path,
                mime_type = EXCLUDED.mime_type,
                size_bytes = EXCLUDED.size_bytes,
                status = EXCLUDED.status,
                transcript = EXCLUDED.transcript,
                error_text = EXCLUDED.error_text,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(recording.id.as_uuid())
        .bind(recording.storage_path.as_str())
        .bind(&recording.mime_type)
        .bind(recording.size_bytes as i64)
        .bind(recording.status.as_str())
        .bind(&recording.transcript)
        .bind(&recording.error_text)
        .bind(recording.created_at)
        .bind(recording.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(recording_id = %id.as_uuid()))]
    async fn get_by_id(&self, id: RecordingId) -> Result<Option<Recording>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, storage_path, mime_type, size_bytes, status, transcript, error_text,
                   created_at, updated_at
            FROM stt_recordings
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.map(map_row).transpose()
    }

    #[instrument(skip(self, recording), fields(recording_id = %recording.id.as_uuid(), status = %recording.status.as_str()))]
    async fn update(&self, recording: &Recording) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE stt_recordings
            SET status = $2, transcript = $3, error_text = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(recording.id.as_uuid())
        .bind(recording.status.as_str())
        .bind(&recording.transcript)
        .bind(&recording.error_text)
        .bind(recording.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::QueryFailed(format!(
                "recording {} not found",
                recording.id.as_uuid()
            )));
        }
        Ok(())
    }
}
