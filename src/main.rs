use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;

use cyoa_server::application::ports::{
    AuditLogRepository, ConfigurationStore, GameSessionRepository, RecordingRepository,
};
use cyoa_server::application::services::{TranscriptionService, TurnOrchestrator};
use cyoa_server::infrastructure::audio::WhisperApiEngine;
use cyoa_server::infrastructure::llm::ModelRouter;
use cyoa_server::infrastructure::observability::{TracingConfig, init_tracing};
use cyoa_server::infrastructure::persistence::{
    CatalogConfigurationStore, InMemoryAuditLogRepository, InMemoryGameSessionRepository,
    InMemoryRecordingRepository, PgAuditLogRepository, PgGameSessionRepository,
    PgRecordingRepository, create_pool, run_migrations,
};
use cyoa_server::infrastructure::storage::LocalAudioStore;
use cyoa_server::presentation::{AppState, Environment, Settings, create_router};

struct Repositories {
    audit_log: Arc<dyn AuditLogRepository>,
    game_sessions: Arc<dyn GameSessionRepository>,
    recordings: Arc<dyn RecordingRepository>,
}

async fn build_repositories(settings: &Settings) -> anyhow::Result<Repositories> {
    let Some(url) = settings.database.url.as_deref().filter(|u| !u.is_empty()) else {
        tracing::warn!("No database configured, audit logs and sessions are kept in memory");
        return Ok(Repositories {
            audit_log: Arc::new(InMemoryAuditLogRepository::new()),
            game_sessions: Arc::new(InMemoryGameSessionRepository::new()),
            recordings: Arc::new(InMemoryRecordingRepository::new()),
        });
    };

    let pool = create_pool(url, settings.database.max_connections)
        .await
        .context("Failed to connect to PostgreSQL")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(Repositories {
        audit_log: Arc::new(PgAuditLogRepository::new(pool.clone())),
        game_sessions: Arc::new(PgGameSessionRepository::new(pool.clone())),
        recordings: Arc::new(PgRecordingRepository::new(pool)),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(&TracingConfig::new(environment.as_str(), settings.logging.json))
        .context("Failed to initialize tracing")?;

    let configuration_store = Arc::new(
        CatalogConfigurationStore::load(&settings.catalog.path)
            .with_context(|| format!("Failed to load catalog {}", settings.catalog.path.display()))?,
    );
    let models = configuration_store.registered_models().await?;
    let gateway = Arc::new(
        ModelRouter::from_models(
            &models,
            Duration::from_secs(settings.http.connect_timeout_secs),
        )
        .context("Failed to build model router")?,
    );

    let repositories = build_repositories(&settings).await?;

    let orchestrator = Arc::new(TurnOrchestrator::new(
        gateway,
        configuration_store.clone(),
        Arc::clone(&repositories.audit_log),
        repositories.game_sessions,
        settings.pipeline.retry_policy(),
        settings.pipeline.rewrite_retries,
    ));

    let audio_store = Arc::new(
        LocalAudioStore::new(settings.stt.storage_dir.clone())
            .context("Failed to prepare audio storage")?,
    );
    let whisper = Arc::new(WhisperApiEngine::new(
        settings.stt.whisper_url.clone(),
        settings.stt.whisper_model.clone(),
        settings.stt.api_key.clone(),
        Duration::from_secs(settings.stt.timeout_secs),
    ));
    let transcription_service = Arc::new(TranscriptionService::new(
        repositories.recordings,
        audio_store,
        whisper,
    ));

    let state = AppState {
        orchestrator,
        transcription_service,
        configuration_store,
        audit_log: repositories.audit_log,
        max_upload_bytes: settings.stt.max_upload_mb * 1024 * 1024,
    };

    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!(%addr, environment = %environment, "Listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
