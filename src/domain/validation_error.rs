#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("total_turns {0} is not one of 5, 10, 15, 20")]
    UnsupportedTotalTurns(u32),
    #[error("phase {0} has no turns")]
    EmptyPhase(usize),
    #[error("phase turns sum to {actual}, expected {expected}")]
    PhaseSumMismatch { expected: u32, actual: u32 },
    #[error("difficulty curve needs 5 points in [0, 1], got {0:?}")]
    InvalidCurve(Vec<f64>),
    #[error("unknown prompt reference: {0}")]
    UnknownPrompt(String),
    #[error("prompt {0} must have exactly one active version")]
    ActiveVersionCount(String),
    #[error("unknown model reference: {0}")]
    UnknownModel(String),
    #[error("model {0} is marked unavailable")]
    UnavailableModel(String),
    #[error("unknown provider reference: {0}")]
    UnknownProvider(String),
    #[error("unknown difficulty profile: {0}")]
    UnknownDifficulty(String),
    #[error("unknown configuration: {0}")]
    UnknownConfiguration(String),
    #[error("duplicate identifier: {0}")]
    Duplicate(String),
    #[error("invalid prompt {name}: {reason}")]
    InvalidPrompt { name: String, reason: String },
}
