//! Game creation payload and its validation

use crate::color::LegalityOptions;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

pub const CARDS_RANGE: RangeInclusive<usize> = 2..=4;
pub const TIMER_RANGE: RangeInclusive<u32> = 1..=60;
pub const PLAYERS_RANGE: RangeInclusive<u32> = 1..=10;
pub const ROUNDS_RANGE: RangeInclusive<u32> = 1..=10;
pub const TITLE_MAX_CHARS: usize = 64;
pub const INVITE_CODE_CHARS: RangeInclusive<usize> = 6..=32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("gameTitle must be 1-64 characters without leading or trailing whitespace")]
    Title,
    #[error("minCards must be between 2 and 4, got {0}")]
    MinCards(usize),
    #[error("maxCards must be between 2 and 4, got {0}")]
    MaxCards(usize),
    #[error("minCards ({min}) must not exceed maxCards ({max})")]
    CardBounds { min: usize, max: usize },
    #[error("timerDuration must be between 1 and 60 seconds, got {0}")]
    TimerDuration(u32),
    #[error("maxPlayers must be between 1 and 10, got {0}")]
    MaxPlayers(u32),
    #[error("maxRounds must be between 1 and 10, got {0}")]
    MaxRounds(u32),
    #[error("inviteCode must be 6-32 characters of letters, digits and '-'")]
    InviteCode,
}

/// Request to open a new game, as submitted by its creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateGameRequest {
    pub game_title: String,
    pub max_players: u32,
    pub timer_duration: u32,
    pub min_cards: usize,
    pub max_cards: usize,
    pub max_rounds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
}

/// Validated settings of one game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub title: String,
    pub max_players: u32,
    pub timer_duration: u32,
    pub min_cards: usize,
    pub max_cards: usize,
    pub max_rounds: u32,
    pub invite_code: Option<String>,
    pub legality: LegalityOptions,
}

impl GameConfig {
    pub fn with_legality(mut self, legality: LegalityOptions) -> Self {
        self.legality = legality;
        self
    }
}

fn valid_title(title: &str) -> bool {
    let chars = title.chars().count();
    (1..=TITLE_MAX_CHARS).contains(&chars) && title.trim() == title
}

fn valid_invite_code(code: &str) -> bool {
    INVITE_CODE_CHARS.contains(&code.chars().count())
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl CreateGameRequest {
    /// Checks every bound and produces the game settings
    ///
    /// Legality options start permissive; the server applies its own policy
    /// with [`GameConfig::with_legality`].
    pub fn validate(&self) -> Result<GameConfig, ValidationError> {
        if !valid_title(&self.game_title) {
            return Err(ValidationError::Title);
        }
        if !CARDS_RANGE.contains(&self.min_cards) {
            return Err(ValidationError::MinCards(self.min_cards));
        }
        if !CARDS_RANGE.contains(&self.max_cards) {
            return Err(ValidationError::MaxCards(self.max_cards));
        }
        if self.min_cards > self.max_cards {
            return Err(ValidationError::CardBounds {
                min: self.min_cards,
                max: self.max_cards,
            });
        }
        if !TIMER_RANGE.contains(&self.timer_duration) {
            return Err(ValidationError::TimerDuration(self.timer_duration));
        }
        if !PLAYERS_RANGE.contains(&self.max_players) {
            return Err(ValidationError::MaxPlayers(self.max_players));
        }
        if !ROUNDS_RANGE.contains(&self.max_rounds) {
            return Err(ValidationError::MaxRounds(self.max_rounds));
        }
        if let Some(code) = &self.invite_code {
            if !valid_invite_code(code) {
                return Err(ValidationError::InviteCode);
            }
        }

        Ok(GameConfig {
            title: self.game_title.clone(),
            max_players: self.max_players,
            timer_duration: self.timer_duration,
            min_cards: self.min_cards,
            max_cards: self.max_cards,
            max_rounds: self.max_rounds,
            invite_code: self.invite_code.clone(),
            legality: LegalityOptions::default(),
        })
    }
}
