mod conversation_input;
mod judge_pipeline;
mod keyed_locks;
mod refusal_detector;
mod retry_policy;
mod transcript_cleaner;
mod transcription_service;
mod turn_orchestrator;

pub use conversation_input::{
    ConversationInputError, PreparedConversation, append_session_marker, extract_session_id,
    prepare_conversation, strip_session_markers,
};
pub use judge_pipeline::{JudgeOutcome, JudgePipeline};
pub use keyed_locks::{KeyedGuard, KeyedLocks};
pub use refusal_detector::{
    DEFAULT_CORRECTION_INSTRUCTION, RefusalDetector, RefusalOutcome, StorytellerCall,
    with_corrective_instruction,
};
pub use retry_policy::{Invocation, InvocationFailure, RetryPolicy};
pub use transcript_cleaner::clean_transcript;
pub use transcription_service::{SttError, TranscriptionService, UploadOutcome};
pub use turn_orchestrator::{
    DEFAULT_ENDING_PROMPT, TEST_MODE_RESPONSE, TurnError, TurnOrchestrator, TurnOutcome,
    TurnRequest,
};
