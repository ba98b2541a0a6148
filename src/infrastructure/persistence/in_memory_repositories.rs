use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{
    AuditLogRepository, GameSessionRepository, RecordingRepository, RepositoryError,
};
use crate::domain::{
    AuditLogEntry, AuditLogId, ConversationFingerprint, GameSession, Recording, RecordingId,
    SessionId,
};

const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

#[derive(Default)]
struct AuditEntries {
    by_id: HashMap<AuditLogId, AuditLogEntry>,
    /// Oldest first.
    order: VecDeque<AuditLogId>,
}

/// Process-local storage used when no database is configured.
/// Keeps the most recent `capacity` audit entries.
pub struct InMemoryAuditLogRepository {
    entries: RwLock<AuditEntries>,
    capacity: usize,
}

impl Default for InMemoryAuditLogRepository {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(AuditEntries::default()),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn record(&self, entry: &AuditLogEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        if entries.by_id.insert(entry.id, entry.clone()).is_none() {
            entries.order.push_back(entry.id);
        }
        while entries.order.len() > self.capacity {
            if let Some(evicted) = entries.order.pop_front() {
                entries.by_id.remove(&evicted);
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: AuditLogId) -> Result<Option<AuditLogEntry>, RepositoryError> {
        Ok(self.entries.read().await.by_id.get(&id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| entries.by_id.get(id).cloned())
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryGameSessionRepository {
    sessions: RwLock<HashMap<SessionId, GameSession>>,
}

impl InMemoryGameSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameSessionRepository for InMemoryGameSessionRepository {
    async fn get(&self, id: &SessionId) -> Result<Option<GameSession>, RepositoryError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &ConversationFingerprint,
    ) -> Result<Option<GameSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.fingerprint.as_ref() == Some(fingerprint))
            .max_by_key(|s| s.updated_at)
            .cloned())
    }

    async fn save(&self, session: &GameSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let mut session = session.clone();
        if session.fingerprint.is_none() {
            session.fingerprint = sessions.get(&session.id).and_then(|s| s.fingerprint.clone());
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRecordingRepository {
    recordings: RwLock<HashMap<RecordingId, Recording>>,
}

impl InMemoryRecordingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordingRepository for InMemoryRecordingRepository {
    async fn create(&self, recording: &Recording) -> Result<(), RepositoryError> {
        self.recordings
            .write()
            .await
            .insert(recording.id, recording.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: RecordingId) -> Result<Option<Recording>, RepositoryError> {
        Ok(self.recordings.read().await.get(&id).cloned())
    }

    async fn update(&self, recording: &Recording) -> Result<(), RepositoryError> {
        let mut recordings = self.recordings.write().await;
        match recordings.get_mut(&recording.id) {
            Some(existing) => {
                *existing = recording.clone();
                Ok(())
            }
            None => Err(RepositoryError::QueryFailed(format!(
                "recording {} not found",
                recording.id.as_uuid()
            ))),
        }
    }
}
