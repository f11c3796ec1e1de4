//! Error types for the game server
//!
//! Rejections of session operations are ordinary values here: the registry
//! decides from [`ActionError::notice`] whether the actor hears about it.

use crate::round::RoundEvent;
use shared::{GameId, PlayerId, RoundState, StatusLevel, ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("card catalog is empty")]
    EmptyCatalog,
    #[error("cannot draw between {min} and {max} cards from a catalog of {available}")]
    Bounds {
        min: usize,
        max: usize,
        available: usize,
    },
    #[error("no legal target found after {0} attempts")]
    Exhausted(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} to a round that is {from:?}")]
pub struct TransitionError {
    pub from: RoundState,
    pub event: RoundEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("player {0} is not part of this game")]
    UnknownPlayer(PlayerId),
    #[error("only the host can {0}")]
    NotHost(&'static str),
    #[error("there is no current round")]
    NoRound,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("picks are only accepted while a round is playing")]
    RoundNotPlaying,
    #[error("the current round has not finished yet")]
    PreviousRoundUnfinished,
    #[error("maximum number of rounds reached")]
    MaxRoundsReached,
    #[error("chat message is empty")]
    EmptyChat,
    #[error("chat message exceeds {0} characters")]
    ChatTooLong(usize),
    #[error("failed to create round: {0}")]
    Generate(#[from] GenerateError),
}

impl ActionError {
    /// Status message owed to the actor, if any
    ///
    /// Capacity boundaries are warnings, generation failures are errors and
    /// everything else is a protocol violation that is only logged.
    pub fn notice(&self) -> Option<(StatusLevel, &'static str)> {
        match self {
            ActionError::MaxRoundsReached => Some((
                StatusLevel::Warning,
                "Maximum number of rounds reached. Cannot start a new round.",
            )),
            ActionError::Generate(_) => Some((StatusLevel::Error, "Error creating new round.")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Maximum number of players reached. Cannot add more players.")]
    GameFull,
}

/// Why a connection was turned away; the text is sent to the client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("No users available on the server. Please contact the administrator.")]
    NoUsers,
    #[error("You are not logged in. Please log in to join the game.")]
    Unauthenticated,
    #[error("Your user account is not recognized. Please contact the administrator.")]
    UnknownUser,
    #[error("No game ID provided. Please try again later.")]
    MissingGameId,
    #[error("Game not found. Please try again later.")]
    GameNotFound,
    #[error("Game is full. You cannot join now.")]
    GameFull,
    #[error("Game already started. You cannot join now.")]
    AlreadyStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid create game payload: {0}")]
    Invalid(#[from] ValidationError),
    #[error("game with id {0} already exists")]
    DuplicateGame(GameId),
    #[error("failed to create first round: {0}")]
    FirstRound(#[from] ActionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token secret must not be empty")]
    InvalidSecret,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_a_warning() {
        let (level, text) = ActionError::MaxRoundsReached.notice().unwrap();
        assert_eq!(level, StatusLevel::Warning);
        assert!(text.contains("Maximum number of rounds"));
    }

    #[test]
    fn test_generation_failure_is_an_error() {
        let error = ActionError::from(GenerateError::EmptyCatalog);
        assert_eq!(error.notice().map(|(level, _)| level), Some(StatusLevel::Error));
    }

    #[test]
    fn test_protocol_violations_are_silent() {
        let silent = [
            ActionError::NotHost("start a round"),
            ActionError::NoRound,
            ActionError::RoundNotPlaying,
            ActionError::PreviousRoundUnfinished,
            ActionError::EmptyChat,
            ActionError::UnknownPlayer("p9".to_string()),
            ActionError::Transition(TransitionError {
                from: RoundState::Playing,
                event: RoundEvent::Start,
            }),
        ];
        for error in silent {
            assert!(error.notice().is_none(), "{} should be silent", error);
        }
    }

    #[test]
    fn test_registry_error_wraps_validation() {
        let error = RegistryError::from(ValidationError::MaxRounds(0));
        assert!(error.to_string().starts_with("invalid create game payload"));
    }
}
