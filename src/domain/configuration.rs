use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{DifficultyProfile, JudgeStepConfig, ModelId, Pacing, Prompt};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationId(String);

impl ConfigurationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigurationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefusalSettings {
    pub classifier_model: ModelId,
    pub classifier_prompt: String,
    pub question: String,
    pub correction_instruction: String,
    pub timeout: Duration,
}

/// Read-only snapshot of the active game configuration, prompts resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfiguration {
    pub id: ConfigurationId,
    pub name: String,
    pub adventure_prompt: Prompt,
    pub judge_prompt: Prompt,
    pub ending_prompt: Option<Prompt>,
    pub storyteller_model: ModelId,
    pub storyteller_timeout: Duration,
    pub judge_model: ModelId,
    pub judge_timeout: Duration,
    pub pacing: Pacing,
    pub refusal: Option<RefusalSettings>,
    pub judge_steps: Vec<JudgeStepConfig>,
    pub difficulty: Option<DifficultyProfile>,
}

impl GameConfiguration {
    pub fn storyteller_system_prompt(&self) -> String {
        self.pacing.dictionary().apply(&self.adventure_prompt.text)
    }

    pub fn enabled_judge_steps(&self) -> impl Iterator<Item = &JudgeStepConfig> {
        self.judge_steps.iter().filter(|step| step.enabled)
    }
}
