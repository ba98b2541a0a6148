use async_trait::async_trait;

use crate::domain::{ConversationFingerprint, GameSession, SessionId};

use super::RepositoryError;

#[async_trait]
pub trait GameSessionRepository: Send + Sync {
    async fn get(&self, id: &SessionId) -> Result<Option<GameSession>, RepositoryError>;

    async fn find_by_fingerprint(
        &self,
        fingerprint: &ConversationFingerprint,
    ) -> Result<Option<GameSession>, RepositoryError>;

    async fn save(&self, session: &GameSession) -> Result<(), RepositoryError>;
}
