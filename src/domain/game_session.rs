use chrono::{DateTime, Utc};

use super::{ConfigurationId, ConversationFingerprint, SessionId};

/// Per-conversation game progress.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    pub id: SessionId,
    pub fingerprint: Option<ConversationFingerprint>,
    pub configuration_id: Option<ConfigurationId>,
    pub turn_number: u32,
    pub max_turns: u32,
    pub game_over: bool,
    pub last_death_roll: Option<f64>,
    pub last_death_probability: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(id: SessionId, configuration_id: ConfigurationId, max_turns: u32) -> Self {
        let now = Utc::now();
        Self {
            id,
            fingerprint: None,
            configuration_id: Some(configuration_id),
            turn_number: 0,
            max_turns,
            game_over: false,
            last_death_roll: None,
            last_death_probability: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_turn(&mut self, turn_number: u32, ended: bool) {
        self.turn_number = turn_number;
        self.game_over = self.game_over || ended || turn_number >= self.max_turns;
        self.updated_at = Utc::now();
    }

    pub fn record_roll(&mut self, roll: f64, probability: f64) {
        self.last_death_roll = Some(roll);
        self.last_death_probability = Some(probability);
    }
}
