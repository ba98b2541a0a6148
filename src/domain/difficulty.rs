use serde::Serialize;

use super::ValidationError;

/// Death probability curve sampled at 0, 25, 50, 75 and 100 % of the game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyProfile {
    name: String,
    curve_points: [f64; 5],
}

impl DifficultyProfile {
    pub fn new(name: impl Into<String>, curve_points: &[f64]) -> Result<Self, ValidationError> {
        let points: [f64; 5] = curve_points
            .try_into()
            .map_err(|_| ValidationError::InvalidCurve(curve_points.to_vec()))?;
        if points.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(ValidationError::InvalidCurve(curve_points.to_vec()));
        }
        Ok(Self {
            name: name.into(),
            curve_points: points,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn curve_points(&self) -> [f64; 5] {
        self.curve_points
    }

    pub fn death_probability(&self, turn: u32, max_turns: u32) -> f64 {
        if turn == 0 || max_turns == 0 {
            return self.curve_points[0];
        }
        let progress = (f64::from(turn) / f64::from(max_turns)).clamp(0.0, 1.0);
        let segment = ((progress / 0.25).floor() as usize).min(3);
        let local = (progress - segment as f64 * 0.25) / 0.25;
        let start = self.curve_points[segment];
        let end = self.curve_points[segment + 1];
        (start + (end - start) * local).clamp(0.0, 1.0)
    }

    /// Turn 1 always survives so the adventure can be established.
    pub fn should_end(&self, turn: u32, max_turns: u32, roll: f64) -> bool {
        turn > 1 && roll < self.death_probability(turn, max_turns)
    }
}
