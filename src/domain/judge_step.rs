use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Failure, ModelId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeStepKind {
    Classifier,
    Rewriter,
    Comparator,
}

impl JudgeStepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeStepKind::Classifier => "classifier",
            JudgeStepKind::Rewriter => "rewriter",
            JudgeStepKind::Comparator => "comparator",
        }
    }
}

impl FromStr for JudgeStepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classifier" => Ok(JudgeStepKind::Classifier),
            "rewriter" => Ok(JudgeStepKind::Rewriter),
            "comparator" => Ok(JudgeStepKind::Comparator),
            _ => Err(format!("Invalid judge step kind: {}", s)),
        }
    }
}

impl fmt::Display for JudgeStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One configured judge step with its prompt text already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeStepConfig {
    pub name: String,
    pub kind: JudgeStepKind,
    pub enabled: bool,
    pub model: ModelId,
    pub system_prompt: String,
    /// Question for classifiers and comparators, rewrite instruction for rewriters.
    pub instruction: String,
    pub use_full_context: bool,
    pub timeout: Duration,
}

/// Execution record of a single judge step; immutable once pushed to the trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeStepRecord {
    pub name: String,
    pub kind: JudgeStepKind,
    pub input: String,
    pub output: String,
    pub modified: bool,
    pub skipped: bool,
    pub violation: Option<bool>,
    pub response: Option<String>,
    pub attempts: u32,
    pub retry_count: u32,
    pub transient_retries: u32,
    pub error: Option<Failure>,
    pub elapsed_ms: u64,
}

impl JudgeStepRecord {
    pub fn started(step: &JudgeStepConfig, input: &str) -> Self {
        Self {
            name: step.name.clone(),
            kind: step.kind,
            input: input.to_string(),
            output: input.to_string(),
            modified: false,
            skipped: false,
            violation: None,
            response: None,
            attempts: 0,
            retry_count: 0,
            transient_retries: 0,
            error: None,
            elapsed_ms: 0,
        }
    }
}
