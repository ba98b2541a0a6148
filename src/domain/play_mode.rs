use std::fmt;

use serde::{Deserialize, Serialize};

pub const MODERATED_MODEL: &str = "gameserver-cyoa";
pub const STORYTELLER_ONLY_MODEL: &str = "gameserver-cyoa-base";
pub const TEST_MODEL: &str = "gameserver-cyoa-test";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Storyteller, refusal correction and the judge pipeline.
    Moderated,
    /// Storyteller and refusal correction only.
    StorytellerOnly,
    /// Fixed reply without any model call.
    Test,
}

impl PlayMode {
    pub fn from_model_name(model: &str) -> Self {
        if model.contains("cyoa-test") {
            PlayMode::Test
        } else if model.contains("cyoa-base") {
            PlayMode::StorytellerOnly
        } else {
            PlayMode::Moderated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayMode::Moderated => "moderated",
            PlayMode::StorytellerOnly => "storyteller_only",
            PlayMode::Test => "test",
        }
    }

    pub fn runs_judge(&self) -> bool {
        matches!(self, PlayMode::Moderated)
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
