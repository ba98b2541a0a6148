use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Adventure,
    Judge,
    Ending,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Adventure => "adventure",
            PromptKind::Judge => "judge",
            PromptKind::Ending => "ending",
        }
    }
}

impl FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adventure" => Ok(PromptKind::Adventure),
            "judge" => Ok(PromptKind::Judge),
            "ending" => Ok(PromptKind::Ending),
            _ => Err(format!("Invalid prompt kind: {}", s)),
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable version of a named prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub kind: PromptKind,
    pub name: String,
    pub version: u32,
    pub text: String,
    pub is_active: bool,
}

impl Prompt {
    pub fn new(kind: PromptKind, name: impl Into<String>, version: u32, text: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            version,
            text: text.into(),
            is_active: false,
        }
    }

    pub fn activated(mut self) -> Self {
        self.is_active = true;
        self
    }
}
