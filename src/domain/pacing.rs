use serde::Serialize;

use super::ValidationError;

pub const SUPPORTED_TOTAL_TURNS: [u32; 4] = [5, 10, 15, 20];

/// Turn budget of one adventure split across its four story phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pacing {
    total_turns: u32,
    phase_turns: [u32; 4],
}

impl Pacing {
    pub fn new(total_turns: u32, phase_turns: [u32; 4]) -> Result<Self, ValidationError> {
        if !SUPPORTED_TOTAL_TURNS.contains(&total_turns) {
            return Err(ValidationError::UnsupportedTotalTurns(total_turns));
        }
        if let Some(phase) = phase_turns.iter().position(|turns| *turns == 0) {
            return Err(ValidationError::EmptyPhase(phase + 1));
        }
        let sum: u32 = phase_turns.iter().sum();
        if sum != total_turns {
            return Err(ValidationError::PhaseSumMismatch {
                expected: total_turns,
                actual: sum,
            });
        }
        Ok(Self {
            total_turns,
            phase_turns,
        })
    }

    /// Stock split used when a configuration only names a game length.
    pub fn default_for(total_turns: u32) -> Result<Self, ValidationError> {
        let phase_turns = match total_turns {
            5 => [1, 1, 2, 1],
            10 => [3, 3, 3, 1],
            15 => [4, 5, 4, 2],
            20 => [5, 6, 6, 3],
            other => return Err(ValidationError::UnsupportedTotalTurns(other)),
        };
        Self::new(total_turns, phase_turns)
    }

    pub fn total_turns(&self) -> u32 {
        self.total_turns
    }

    pub fn phase_turns(&self) -> [u32; 4] {
        self.phase_turns
    }

    pub fn phase_ends(&self) -> [u32; 4] {
        let mut ends = [0; 4];
        let mut running = 0;
        for (end, turns) in ends.iter_mut().zip(self.phase_turns) {
            running += turns;
            *end = running;
        }
        ends
    }

    pub fn dictionary(&self) -> PacingDictionary {
        let mut entries = vec![("TOTAL_TURNS".to_string(), self.total_turns)];
        for (index, turns) in self.phase_turns.iter().enumerate() {
            entries.push((format!("PHASE{}_TURNS", index + 1), *turns));
        }
        for (index, end) in self.phase_ends().iter().enumerate() {
            entries.push((format!("PHASE{}_END", index + 1), *end));
        }
        PacingDictionary { entries }
    }
}

/// Placeholder values derived from a [`Pacing`]; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingDictionary {
    entries: Vec<(String, u32)>,
}

impl PacingDictionary {
    pub fn get(&self, key: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| *value)
    }

    pub fn entries(&self) -> &[(String, u32)] {
        &self.entries
    }

    /// Literal `{KEY}` replacement; unknown placeholders stay as written.
    pub fn apply(&self, template: &str) -> String {
        self.entries
            .iter()
            .fold(template.to_string(), |text, (key, value)| {
                text.replace(&format!("{{{}}}", key), &value.to_string())
            })
    }
}
