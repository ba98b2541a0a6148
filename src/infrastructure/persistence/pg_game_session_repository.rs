use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{GameSessionRepository, RepositoryError};
use crate::domain::{ConfigurationId, ConversationFingerprint, GameSession, SessionId};

pub struct PgGameSessionRepository {
    pool: PgPool,
}

impl PgGameSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_SESSION: &str = r#"
    SELECT session_id, fingerprint, configuration_id, turn_number, max_turns, game_over,
           last_death_roll, last_death_probability, created_at, updated_at
    FROM game_sessions
"#;

fn map_row(row: PgRow) -> Result<GameSession, RepositoryError> {
    let corrupt = |e: sqlx::Error| RepositoryError::CorruptRecord(e.to_string());

    let id: String = row.try_get("session_id").map_err(corrupt)?;
    let fingerprint: Option<String> = row.try_get("fingerprint").map_err(corrupt)?;
    let configuration_id: Option<String> = row.try_get("configuration_id").map_err(corrupt)?;
    let turn_number: i32 = row.try_get("turn_number").map_err(corrupt)?;
    let max_turns: i32 = row.try_get("max_turns").map_err(corrupt)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(corrupt)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(corrupt)?;

    Ok(GameSession {
        id: SessionId::parse(&id).map_err(RepositoryError::CorruptRecord)?,
        fingerprint: fingerprint.map(ConversationFingerprint::from_raw),
        configuration_id: configuration_id.map(ConfigurationId::new),
        turn_number: turn_number.max(0) as u32,
        max_turns: max_turns.max(0) as u32,
        game_over: row.try_get("game_over").map_err(corrupt)?,
        last_death_roll: row.try_get("last_death_roll").map_err(corrupt)?,
        last_death_probability: row.try_get("last_death_probability").map_err(corrupt)?,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl GameSessionRepository for PgGameSessionRepository {
    #[instrument(skip(self), fields(session_id = %id))]
    async fn get(&self, id: &SessionId) -> Result<Option<GameSession>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE session_id = $1", SELECT_SESSION))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.map(map_row).transpose()
    }

    #[instrument(skip(self, fingerprint), fields(fingerprint = %fingerprint.as_str()))]
    async fn find_by_fingerprint(
        &self,
        fingerprint: &ConversationFingerprint,
    ) -> Result<Option<GameSession>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{} WHERE fingerprint = $1 ORDER BY updated_at DESC LIMIT 1",
            SELECT_SESSION
        ))
        .bind(fingerprint.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.map(map_row).transpose()
    }

    #[instrument(skip(self, session), fields(session_id = %session.id, turn = session.turn_number))]
    async fn save(&self, session: &GameSession) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO game_sessions (session_id, fingerprint, configuration_id, turn_number,
                                       max_turns, game_over, last_death_roll,
                                       last_death_probability, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (session_id) DO UPDATE SET
                fingerprint = COALESCE(EXCLUDED.fingerprint, game_sessions.fingerprint),
                configuration_id = EXCLUDED.configuration_id,
                turn_number = EXCLUDED.turn_number,
                max_turns = EXCLUDED.max_turns,
                game_over = EXCLUDED.game_over,
                last_death_roll = EXCLUDED.last_death_roll,
                last_death_probability = EXCLUDED.last_death_probability,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(session.id.as_str())
        .bind(session.fingerprint.as_ref().map(|f| f.as_str().to_string()))
        .bind(session.configuration_id.as_ref().map(|c| c.as_str().to_string()))
        .bind(session.turn_number as i32)
        .bind(session.max_turns as i32)
        .bind(session.game_over)
        .bind(session.last_death_roll)
        .bind(session.last_death_probability)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}
