use std::sync::Arc;
use std::time::Duration;

use cyoa_server::application::ports::{AudioStore, AudioStoreError, TranscriptionError};
use cyoa_server::application::services::{SttError, TranscriptionService};
use cyoa_server::domain::{RecordingId, RecordingStatus};
use cyoa_server::infrastructure::persistence::InMemoryRecordingRepository;
use cyoa_server::infrastructure::storage::LocalAudioStore;
use tempfile::TempDir;

use crate::helpers::{ScriptedEngine, audio_stream};

struct Fixture {
    service: Arc<TranscriptionService>,
    engine: Arc<ScriptedEngine>,
    audio_store: Arc<LocalAudioStore>,
    _dir: TempDir,
}

fn fixture(engine: ScriptedEngine) -> Fixture {
    let dir = TempDir::new().unwrap();
    let audio_store = Arc::new(LocalAudioStore::new(dir.path().to_path_buf()).unwrap());
    let engine = Arc::new(engine);
    let service = Arc::new(TranscriptionService::new(
        Arc::new(InMemoryRecordingRepository::new()),
        audio_store.clone(),
        engine.clone(),
    ));
    Fixture {
        service,
        engine,
        audio_store,
        _dir: dir,
    }
}

#[tokio::test]
async fn given_audio_when_uploading_then_recording_stored_as_uploaded() {
    let f = fixture(ScriptedEngine::transcribing("hello"));

    let outcome = f
        .service
        .upload(None, "audio/webm", audio_stream(b"voice-bytes"))
        .await
        .unwrap();

    assert!(!outcome.already_existed);
    assert_eq!(outcome.recording.status, RecordingStatus::Uploaded);
    assert_eq!(outcome.recording.size_bytes, 11);
    assert!(outcome.recording.storage_path.as_str().ends_with(".webm"));

    let stored = f.audio_store.fetch(&outcome.recording.storage_path).await.unwrap();
    assert_eq!(stored, b"voice-bytes");
}

#[tokio::test]
async fn given_existing_recording_id_when_uploading_again_then_existing_record_returned() {
    let f = fixture(ScriptedEngine::transcribing("hello"));
    let id = RecordingId::new();

    f.service
        .upload(Some(id), "audio/webm", audio_stream(b"first"))
        .await
        .unwrap();
    let second = f
        .service
        .upload(Some(id), "audio/webm", audio_stream(b"second take"))
        .await
        .unwrap();

    assert!(second.already_existed);
    assert_eq!(second.recording.size_bytes, 5);
    let stored = f.audio_store.fetch(&second.recording.storage_path).await.unwrap();
    assert_eq!(stored, b"first");
}

#[tokio::test]
async fn given_uploaded_recording_when_transcribing_twice_then_engine_called_once() {
    let f = fixture(ScriptedEngine::transcribing("  I open   the door. Thank you for watching! "));
    let id = RecordingId::new();
    f.service
        .upload(Some(id), "audio/wav", audio_stream(b"wav-data"))
        .await
        .unwrap();

    let first = f.service.transcribe(id).await.unwrap();
    let second = f.service.transcribe(id).await.unwrap();

    assert_eq!(first.status, RecordingStatus::Transcribed);
    assert_eq!(first.transcript.as_deref(), Some("I open the door."));
    assert_eq!(second.transcript, first.transcript);
    assert_eq!(f.engine.calls(), 1);
}

#[tokio::test]
async fn given_concurrent_transcribe_requests_when_racing_then_engine_called_once() {
    let f = fixture(ScriptedEngine::transcribing("go west").with_delay(Duration::from_millis(50)));
    let id = RecordingId::new();
    f.service
        .upload(Some(id), "audio/webm", audio_stream(b"clip"))
        .await
        .unwrap();

    let (first, second) = tokio::join!(f.service.transcribe(id), f.service.transcribe(id));

    assert_eq!(first.unwrap().transcript.as_deref(), Some("go west"));
    assert_eq!(second.unwrap().transcript.as_deref(), Some("go west"));
    assert_eq!(f.engine.calls(), 1);
}

#[tokio::test]
async fn given_engine_failure_when_transcribing_then_marked_failed_and_retry_allowed() {
    let f = fixture(ScriptedEngine::new(vec![
        Err(TranscriptionError::Timeout("slow".to_string())),
        Ok("second try".to_string()),
    ]));
    let id = RecordingId::new();
    f.service
        .upload(Some(id), "audio/webm", audio_stream(b"clip"))
        .await
        .unwrap();

    let error = f.service.transcribe(id).await.unwrap_err();
    assert!(matches!(error, SttError::Transcription(_)));

    let failed = f.service.status(id).await.unwrap();
    assert_eq!(failed.status, RecordingStatus::Failed);
    assert!(failed.error_text.is_some());

    let retried = f.service.transcribe(id).await.unwrap();
    assert_eq!(retried.transcript.as_deref(), Some("second try"));
    assert!(retried.error_text.is_none());
}

#[tokio::test]
async fn given_unknown_recording_when_transcribing_then_not_found() {
    let f = fixture(ScriptedEngine::transcribing("unused"));

    let error = f.service.transcribe(RecordingId::new()).await.unwrap_err();

    assert!(matches!(error, SttError::NotFound(_)));
    assert_eq!(f.engine.calls(), 0);
}

#[tokio::test]
async fn given_recording_when_discarding_then_audio_removed_and_record_marked_deleted() {
    let f = fixture(ScriptedEngine::transcribing("unused"));
    let id = RecordingId::new();
    let uploaded = f
        .service
        .upload(Some(id), "audio/webm", audio_stream(b"clip"))
        .await
        .unwrap();

    assert!(f.service.discard(id).await.unwrap());
    assert!(!f.service.discard(id).await.unwrap());

    let status = f.service.status(id).await.unwrap();
    assert_eq!(status.status, RecordingStatus::Deleted);
    assert!(matches!(
        f.audio_store.fetch(&uploaded.recording.storage_path).await,
        Err(AudioStoreError::NotFound(_))
    ));
    assert!(matches!(
        f.service.transcribe(id).await,
        Err(SttError::NotFound(_))
    ));
}

#[tokio::test]
async fn given_discarded_recording_when_uploading_same_id_then_stored_fresh() {
    let f = fixture(ScriptedEngine::transcribing("unused"));
    let id = RecordingId::new();
    f.service
        .upload(Some(id), "audio/webm", audio_stream(b"old"))
        .await
        .unwrap();
    f.service.discard(id).await.unwrap();

    let outcome = f
        .service
        .upload(Some(id), "audio/webm", audio_stream(b"newer"))
        .await
        .unwrap();

    assert!(!outcome.already_existed);
    assert_eq!(outcome.recording.status, RecordingStatus::Uploaded);
    assert_eq!(outcome.recording.size_bytes, 5);
}

#[tokio::test]
async fn given_unknown_recording_when_discarding_then_nothing_discarded() {
    let f = fixture(ScriptedEngine::transcribing("unused"));

    assert!(!f.service.discard(RecordingId::new()).await.unwrap());
}
