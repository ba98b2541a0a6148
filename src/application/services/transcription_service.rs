use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use tracing::{info, instrument, warn};

use crate::application::ports::{
    AudioStore, AudioStoreError, RecordingRepository, RepositoryError, TranscriptionEngine,
    TranscriptionError,
};
use crate::domain::{Recording, RecordingId, RecordingStatus, StoragePath, audio_extension};

use super::{KeyedLocks, clean_transcript};

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub recording: Recording,
    pub already_existed: bool,
}

/// Voice clip lifecycle: upload, transcribe once, inspect, discard.
pub struct TranscriptionService {
    recordings: Arc<dyn RecordingRepository>,
    audio_store: Arc<dyn AudioStore>,
    engine: Arc<dyn TranscriptionEngine>,
    locks: KeyedLocks<RecordingId>,
}

impl TranscriptionService {
    pub fn new(
        recordings: Arc<dyn RecordingRepository>,
        audio_store: Arc<dyn AudioStore>,
        engine: Arc<dyn TranscriptionEngine>,
    ) -> Self {
        Self {
            recordings,
            audio_store,
            engine,
            locks: KeyedLocks::new(),
        }
    }

    /// Stores a clip. Re-uploading a live recording id returns the existing record untouched.
    #[instrument(skip(self, recording_id, stream), fields(recording_id = tracing::field::Empty))]
    pub async fn upload(
        &self,
        recording_id: Option<RecordingId>,
        mime_type: &str,
        stream: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<UploadOutcome, SttError> {
        let id = recording_id.unwrap_or_default();
        tracing::Span::current().record("recording_id", tracing::field::display(id.as_uuid()));
        let _guard = self.locks.acquire(&id).await;

        let existing = self.recordings.get_by_id(id).await?;
        if let Some(recording) = existing.as_ref().filter(|r| !r.is_deleted()) {
            info!(status = %recording.status, "Recording already exists");
            return Ok(UploadOutcome {
                recording: recording.clone(),
                already_existed: true,
            });
        }

        let path = StoragePath::for_recording(&id, audio_extension(mime_type));
        let size_bytes = self.audio_store.store(&path, stream).await?;
        let recording = Recording::new(id, path, mime_type.to_string(), size_bytes);

        if existing.is_some() {
            self.recordings.update(&recording).await?;
        } else {
            self.recordings.create(&recording).await?;
        }

        info!(size_bytes, path = %recording.storage_path, "Recording stored");
        Ok(UploadOutcome {
            recording,
            already_existed: false,
        })
    }

    /// Transcribes at most once per recording; later calls return the stored transcript.
    #[instrument(skip(self), fields(recording_id = %id.as_uuid()))]
    pub async fn transcribe(&self, id: RecordingId) -> Result<Recording, SttError> {
        let _guard = self.locks.acquire(&id).await;

        let mut recording = self.live_recording(id).await?;
        if recording.cached_transcript().is_some() {
            info!("Returning cached transcript");
            return Ok(recording);
        }

        recording.transition(RecordingStatus::Processing);
        recording.error_text = None;
        self.recordings.update(&recording).await?;

        let result = match self.audio_store.fetch(&recording.storage_path).await {
            Ok(audio) => self
                .engine
                .transcribe(&audio, &recording.mime_type)
                .await
                .map_err(SttError::from),
            Err(e) => Err(SttError::from(e)),
        };

        match result {
            Ok(raw) => {
                let transcript = clean_transcript(&raw);
                info!(chars = transcript.len(), "Recording transcribed");
                recording.transcript = Some(transcript);
                recording.transition(RecordingStatus::Transcribed);
                self.recordings.update(&recording).await?;
                Ok(recording)
            }
            Err(e) => {
                warn!(error = %e, "Transcription failed");
                recording.error_text = Some(e.to_string());
                recording.transition(RecordingStatus::Failed);
                self.recordings.update(&recording).await?;
                Err(e)
            }
        }
    }

    pub async fn status(&self, id: RecordingId) -> Result<Recording, SttError> {
        self.recordings
            .get_by_id(id)
            .await?
            .ok_or(SttError::NotFound(id))
    }

    /// Removes the audio and marks the record deleted. Returns false when nothing was live.
    #[instrument(skip(self), fields(recording_id = %id.as_uuid()))]
    pub async fn discard(&self, id: RecordingId) -> Result<bool, SttError> {
        let _guard = self.locks.acquire(&id).await;

        let Some(mut recording) = self.recordings.get_by_id(id).await? else {
            return Ok(false);
        };
        if recording.is_deleted() {
            return Ok(false);
        }

        if let Err(e) = self.audio_store.delete(&recording.storage_path).await {
            warn!(error = %e, path = %recording.storage_path, "Failed to delete audio file");
        }

        recording.transition(RecordingStatus::Deleted);
        self.recordings.update(&recording).await?;
        info!("Recording discarded");
        Ok(true)
    }

    async fn live_recording(&self, id: RecordingId) -> Result<Recording, SttError> {
        match self.recordings.get_by_id(id).await? {
            Some(recording) if !recording.is_deleted() => Ok(recording),
            _ => Err(SttError::NotFound(id)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SttError {
    #[error("recording not found: {}", .0.as_uuid())]
    NotFound(RecordingId),
    #[error("storage: {0}")]
    Storage(#[from] AudioStoreError),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("transcription: {0}")]
    Transcription(#[from] TranscriptionError),
}
