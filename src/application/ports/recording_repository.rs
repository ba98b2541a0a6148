use async_trait::async_trait;

use crate::domain::{Recording, RecordingId};

use super::RepositoryError;

#[async_trait]
pub trait RecordingRepository: Send + Sync {
    async fn create(&self, recording: &Recording) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: RecordingId) -> Result<Option<Recording>, RepositoryError>;

    async fn update(&self, recording: &Recording) -> Result<(), RepositoryError>;
}
