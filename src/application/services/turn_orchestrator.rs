use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::application::ports::{
    AuditLogRepository, ConfigurationError, ConfigurationStore, GameSessionRepository,
    InvocationOptions, LlmGateway,
};
use crate::domain::{
    AuditLogEntry, AuditLogId, Failure, GameConfiguration, GameSession, JudgeStepRecord, Message,
    MessageRole, PlayMode, SessionId, TurnStage,
};

use super::{
    ConversationInputError, JudgePipeline, KeyedLocks, PreparedConversation, RefusalDetector,
    RetryPolicy, StorytellerCall, append_session_marker, prepare_conversation,
};

pub const TEST_MODE_RESPONSE: &str =
    "Test mode is active: this turn was produced without calling any model.";

pub const DEFAULT_ENDING_PROMPT: &str = "You are narrating the final scene of a choose-your-own-adventure game. Bring the story to a close in the same voice it was told in.";

const DEATH_SCENE_INSTRUCTION: &str = "The protagonist has just died due to random chance (difficulty system roll). Write their sudden death scene now (2-4 paragraphs, contextualized to what they were doing, ending with GAME OVER).";

/// One player action as received from a client, system messages included.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub mode: PlayMode,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub audit_id: AuditLogId,
    pub session_id: Option<SessionId>,
    pub final_turn: String,
    pub was_refusal: bool,
    pub was_corrected: bool,
    pub was_modified: bool,
    pub game_ending: bool,
    pub steps: Vec<JudgeStepRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("invalid conversation: {0}")]
    InvalidConversation(#[from] ConversationInputError),
    #[error("configuration unavailable: {source}")]
    Configuration {
        audit_id: AuditLogId,
        source: ConfigurationError,
    },
    #[error("storyteller failed ({}): {}", .failure.kind, .failure.message)]
    Storyteller {
        audit_id: AuditLogId,
        failure: Failure,
    },
}

impl TurnError {
    pub fn audit_id(&self) -> Option<AuditLogId> {
        match self {
            TurnError::InvalidConversation(_) => None,
            TurnError::Configuration { audit_id, .. } | TurnError::Storyteller { audit_id, .. } => {
                Some(*audit_id)
            }
        }
    }
}

struct SessionContext {
    id: SessionId,
    is_new: bool,
}

/// Composes storyteller, refusal correction and judge into one audited turn.
pub struct TurnOrchestrator {
    gateway: Arc<dyn LlmGateway>,
    configuration_store: Arc<dyn ConfigurationStore>,
    audit_log: Arc<dyn AuditLogRepository>,
    game_sessions: Arc<dyn GameSessionRepository>,
    refusal_detector: RefusalDetector,
    judge_pipeline: JudgePipeline,
    retry_policy: RetryPolicy,
    session_locks: KeyedLocks<SessionId>,
    death_roll: Arc<dyn Fn() -> f64 + Send + Sync>,
}

impl TurnOrchestrator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        configuration_store: Arc<dyn ConfigurationStore>,
        audit_log: Arc<dyn AuditLogRepository>,
        game_sessions: Arc<dyn GameSessionRepository>,
        retry_policy: RetryPolicy,
        rewrite_retries: u32,
    ) -> Self {
        Self {
            refusal_detector: RefusalDetector::new(Arc::clone(&gateway), retry_policy.clone()),
            judge_pipeline: JudgePipeline::new(
                Arc::clone(&gateway),
                retry_policy.clone(),
                rewrite_retries,
            ),
            gateway,
            configuration_store,
            audit_log,
            game_sessions,
            retry_policy,
            session_locks: KeyedLocks::new(),
            death_roll: Arc::new(rand::random::<f64>),
        }
    }

    /// Replaces the uniform death roll, e.g. with a fixed value.
    pub fn with_death_roll(mut self, roll: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        self.death_roll = Arc::new(roll);
        self
    }

    #[instrument(skip_all, fields(mode = %request.mode, session_id = tracing::field::Empty))]
    pub async fn play_turn(&self, request: TurnRequest) -> Result<TurnOutcome, TurnError> {
        let prepared = prepare_conversation(&request.messages)?;

        let mut audit = AuditLogEntry::begin(request.mode, request.messages);
        audit.turn_number = prepared.turn_number;

        if request.mode == PlayMode::Test {
            audit.final_turn = Some(TEST_MODE_RESPONSE.to_string());
            let audit_id = audit.id;
            self.persist_audit(audit.finish()).await;
            return Ok(TurnOutcome {
                audit_id,
                session_id: None,
                final_turn: TEST_MODE_RESPONSE.to_string(),
                was_refusal: false,
                was_corrected: false,
                was_modified: false,
                game_ending: false,
                steps: Vec::new(),
            });
        }

        let session = self.resolve_session(&prepared).await;
        tracing::Span::current().record("session_id", tracing::field::display(&session.id));
        audit.session_id = Some(session.id.clone());

        let _turn_guard = self.session_locks.acquire(&session.id).await;

        let result = self
            .run_turn(&prepared, request.mode, &session, &mut audit)
            .await;

        let audit = audit.finish();
        self.persist_audit(audit).await;
        result
    }

    async fn run_turn(
        &self,
        prepared: &PreparedConversation,
        mode: PlayMode,
        session: &SessionContext,
        audit: &mut AuditLogEntry,
    ) -> Result<TurnOutcome, TurnError> {
        let configuration = match self.configuration_store.active_snapshot().await {
            Ok(configuration) => configuration,
            Err(source) => {
                error!(error = %source, "No usable configuration for turn");
                audit.record_error(TurnStage::Configuration, source.to_string());
                return Err(TurnError::Configuration {
                    audit_id: audit.id,
                    source,
                });
            }
        };
        audit.configuration_id = Some(configuration.id.clone());

        let mut game_session = self.load_game_session(session, prepared, &configuration).await;
        let game_ending = self.decide_ending(&configuration, &mut game_session, prepared.turn_number);
        audit.game_ending = game_ending;

        let messages = if game_ending {
            death_scene_messages(&configuration, prepared)
        } else {
            let mut messages = vec![Message::system(configuration.storyteller_system_prompt())];
            messages.extend(prepared.transcript());
            messages
        };
        let options = InvocationOptions::with_timeout(configuration.storyteller_timeout);

        let story_turn = match self
            .retry_policy
            .invoke(
                self.gateway.as_ref(),
                &configuration.storyteller_model,
                &messages,
                &options,
            )
            .await
        {
            Ok(invocation) => invocation.text,
            Err(failure) => {
                let failure = failure.to_failure();
                error!(
                    model = %configuration.storyteller_model,
                    error_kind = %failure.kind,
                    "Storyteller invocation failed"
                );
                audit.record_failure(TurnStage::Storyteller, &failure);
                return Err(TurnError::Storyteller {
                    audit_id: audit.id,
                    failure,
                });
            }
        };
        audit.storyteller_output = Some(story_turn.clone());

        let refusal = self
            .refusal_detector
            .review(
                configuration.refusal.as_ref(),
                StorytellerCall {
                    model: &configuration.storyteller_model,
                    messages: &messages,
                    options: &options,
                },
                story_turn,
            )
            .await;
        if let Some(failure) = &refusal.classifier_error {
            audit.record_failure(TurnStage::RefusalCheck, failure);
        }
        if let Some(failure) = &refusal.correction_error {
            audit.record_failure(TurnStage::RefusalCorrection, failure);
        }
        audit.was_refusal = refusal.was_refusal;
        audit.was_corrected = refusal.was_corrected;
        audit.refusal_classifier_response = Some(refusal.classifier_response.clone());

        let mut final_turn = refusal.final_turn;
        let mut was_modified = false;
        let mut steps = Vec::new();

        if mode.runs_judge() && !game_ending {
            let judged = self
                .judge_pipeline
                .run(&configuration.judge_steps, &prepared.transcript(), &final_turn)
                .await;
            if let Some(failure) = judged.steps.iter().find_map(|step| step.error.as_ref()) {
                audit.record_failure(TurnStage::Judge, failure);
            }
            final_turn = judged.final_turn;
            was_modified = judged.was_modified;
            steps = judged.steps;
        }
        audit.was_modified = was_modified;
        audit.steps = steps.clone();

        game_session.record_turn(prepared.turn_number, game_ending);
        if let Err(e) = self.game_sessions.save(&game_session).await {
            warn!(error = %e, "Failed to save game session");
        }

        if session.is_new {
            final_turn = append_session_marker(&final_turn, &session.id);
        }
        audit.final_turn = Some(final_turn.clone());

        info!(
            turn = prepared.turn_number,
            was_refusal = audit.was_refusal,
            was_corrected = audit.was_corrected,
            was_modified,
            game_ending,
            "Turn completed"
        );

        Ok(TurnOutcome {
            audit_id: audit.id,
            session_id: Some(session.id.clone()),
            final_turn,
            was_refusal: audit.was_refusal,
            was_corrected: audit.was_corrected,
            was_modified,
            game_ending,
            steps,
        })
    }

    async fn resolve_session(&self, prepared: &PreparedConversation) -> SessionContext {
        if let Some(id) = &prepared.session_id {
            return SessionContext {
                id: id.clone(),
                is_new: false,
            };
        }

        if let Some(fingerprint) = &prepared.fingerprint {
            match self.game_sessions.find_by_fingerprint(fingerprint).await {
                Ok(Some(session)) => {
                    info!(session_id = %session.id, "Session recovered from conversation fingerprint");
                    return SessionContext {
                        id: session.id,
                        is_new: false,
                    };
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Fingerprint lookup failed"),
            }
        }

        SessionContext {
            id: SessionId::new(),
            is_new: true,
        }
    }

    async fn load_game_session(
        &self,
        session: &SessionContext,
        prepared: &PreparedConversation,
        configuration: &GameConfiguration,
    ) -> GameSession {
        let existing = match self.game_sessions.get(&session.id).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(error = %e, "Failed to load game session, starting fresh");
                None
            }
        };

        let mut game_session = existing.unwrap_or_else(|| {
            GameSession::new(
                session.id.clone(),
                configuration.id.clone(),
                configuration.pacing.total_turns(),
            )
        });
        if game_session.fingerprint.is_none() {
            game_session.fingerprint = prepared.fingerprint.clone();
        }
        game_session
    }

    fn decide_ending(
        &self,
        configuration: &GameConfiguration,
        game_session: &mut GameSession,
        turn_number: u32,
    ) -> bool {
        if turn_number <= 1 {
            return false;
        }
        if game_session.game_over {
            info!("Game already over, using ending prompt");
            return true;
        }
        let Some(difficulty) = &configuration.difficulty else {
            return false;
        };

        let probability = difficulty.death_probability(turn_number, game_session.max_turns);
        let roll = (self.death_roll)();
        game_session.record_roll(roll, probability);
        let dies = difficulty.should_end(turn_number, game_session.max_turns, roll);
        info!(
            profile = difficulty.name(),
            probability,
            roll,
            dies,
            "Difficulty roll"
        );
        dies
    }

    async fn persist_audit(&self, audit: AuditLogEntry) {
        if let Err(e) = self.audit_log.record(&audit).await {
            error!(audit_id = %audit.id.as_uuid(), error = %e, "Failed to write audit log entry");
        }
    }
}

fn death_scene_messages(
    configuration: &GameConfiguration,
    prepared: &PreparedConversation,
) -> Vec<Message> {
    let system_prompt = configuration
        .ending_prompt
        .as_ref()
        .map(|prompt| configuration.pacing.dictionary().apply(&prompt.text))
        .unwrap_or_else(|| DEFAULT_ENDING_PROMPT.to_string());

    let mut story = String::from("STORY SO FAR:\n\n");
    for message in prepared.transcript() {
        match message.role {
            MessageRole::User => {
                story.push_str(&format!("Player's action: {}\n\n", message.content))
            }
            MessageRole::Assistant => story.push_str(&format!("Story turn: {}\n\n", message.content)),
            MessageRole::System => {}
        }
    }

    vec![
        Message::system(system_prompt),
        Message::user(format!("{}\n{}", story, DEATH_SCENE_INSTRUCTION)),
    ]
}
