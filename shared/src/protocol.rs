//! JSON wire protocol between game clients and the server
//!
//! Every frame is one JSON object tagged by `type`. Inbound frames are
//! [`ClientMessage`]s; outbound frames are [`ServerMessage`]s, which wrap a
//! [`ServerPayload`] in an envelope carrying a unique `id` and a millisecond
//! `timestamp`.

use crate::color::Card;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable authenticated identity of a player
pub type PlayerId = String;
/// Identifier of one game session
pub type GameId = String;

/// Messages sent by a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Chat { content: String },
    CardsPicked { cards: Vec<Card> },
    StartRound,
    NewRound,
}

/// Lifecycle state of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    Waiting,
    Playing,
    Finished,
}

/// Severity of a transient status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Correct,
    Wrong,
}

/// A piece of a rich chat line; `kind` marks highlighted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSegment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SegmentKind>,
}

impl ChatSegment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
        }
    }

    pub fn highlighted(text: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            text: text.into(),
            kind: Some(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub score: i32,
}

/// One round as a particular player is allowed to see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub state: RoundState,
    pub picks: BTreeMap<PlayerId, Vec<Card>>,
    pub target_cards: Option<Vec<Card>>,
    pub target_color: Option<String>,
    pub target_cards_number: Option<usize>,
}

/// Full game snapshot scoped to one viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub game_id: GameId,
    pub game_title: String,
    pub players: Vec<PlayerView>,
    pub timer: u32,
    pub timer_duration: u32,
    pub min_cards: usize,
    pub max_cards: usize,
    pub max_players: u32,
    pub max_rounds: u32,
    pub with_invite_code: bool,
    pub round: u32,
    pub rounds: Vec<RoundView>,
}

/// Body of an outbound message, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerPayload {
    #[serde(rename_all = "camelCase")]
    GameState {
        game_state: GameStateView,
        player_id: PlayerId,
    },
    #[serde(rename_all = "camelCase")]
    StartRound {
        target_color: String,
        target_cards_number: usize,
    },
    NewRound {
        timer: u32,
        round: u32,
    },
    TimerUpdate {
        timer: u32,
    },
    #[serde(rename_all = "camelCase")]
    EndRound {
        target_cards: Vec<Card>,
        picks: BTreeMap<PlayerId, Vec<Card>>,
        scores: BTreeMap<PlayerId, i32>,
    },
    #[serde(rename_all = "camelCase")]
    Chat {
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<PlayerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        segments: Option<Vec<ChatSegment>>,
    },
    Success {
        content: String,
    },
    Info {
        content: String,
    },
    Warning {
        content: String,
    },
    Error {
        content: String,
    },
}

impl ServerPayload {
    pub fn status(level: StatusLevel, content: impl Into<String>) -> Self {
        let content = content.into();
        match level {
            StatusLevel::Success => ServerPayload::Success { content },
            StatusLevel::Info => ServerPayload::Info { content },
            StatusLevel::Warning => ServerPayload::Warning { content },
            StatusLevel::Error => ServerPayload::Error { content },
        }
    }

    /// Severity when this payload is a status message
    pub fn status_level(&self) -> Option<StatusLevel> {
        match self {
            ServerPayload::Success { .. } => Some(StatusLevel::Success),
            ServerPayload::Info { .. } => Some(StatusLevel::Info),
            ServerPayload::Warning { .. } => Some(StatusLevel::Warning),
            ServerPayload::Error { .. } => Some(StatusLevel::Error),
            _ => None,
        }
    }
}

/// Outbound envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub id: String,
    pub timestamp: u64,
    #[serde(flatten)]
    pub payload: ServerPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn envelope(payload: ServerPayload) -> Value {
        serde_json::to_value(ServerMessage {
            id: "msg-1".to_string(),
            timestamp: 1_700_000_000_000,
            payload,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_client_messages() {
        let chat: ClientMessage =
            serde_json::from_str(r#"{"type":"CHAT","content":"hello"}"#).unwrap();
        assert_eq!(
            chat,
            ClientMessage::Chat {
                content: "hello".to_string()
            }
        );

        let picked: ClientMessage =
            serde_json::from_str(r#"{"type":"CARDS_PICKED","cards":["C10","M30"]}"#).unwrap();
        assert_eq!(
            picked,
            ClientMessage::CardsPicked {
                cards: vec![Card::C10, Card::M30]
            }
        );

        let start: ClientMessage = serde_json::from_str(r#"{"type":"START_ROUND"}"#).unwrap();
        assert_eq!(start, ClientMessage::StartRound);

        let new_round: ClientMessage = serde_json::from_str(r#"{"type":"NEW_ROUND"}"#).unwrap();
        assert_eq!(new_round, ClientMessage::NewRound);
    }

    #[test]
    fn test_reject_malformed_client_messages() {
        let inputs = [
            r#"{"type":"DANCE"}"#,
            r#"{"content":"no type"}"#,
            r#"{"type":"CARDS_PICKED","cards":["Z99"]}"#,
            r#"{"type":"CHAT"}"#,
            "not json",
        ];
        for input in inputs {
            assert!(
                serde_json::from_str::<ClientMessage>(input).is_err(),
                "should reject {}",
                input
            );
        }
    }

    #[test]
    fn test_envelope_carries_id_type_and_timestamp() {
        let value = envelope(ServerPayload::TimerUpdate { timer: 7 });
        assert_eq!(
            value,
            json!({"id": "msg-1", "timestamp": 1_700_000_000_000u64, "type": "TIMER_UPDATE", "timer": 7})
        );
    }

    #[test]
    fn test_start_round_hides_card_identities() {
        let value = envelope(ServerPayload::StartRound {
            target_color: "#E6FFFF".to_string(),
            target_cards_number: 2,
        });
        assert_eq!(value["type"], "START_ROUND");
        assert_eq!(value["targetColor"], "#E6FFFF");
        assert_eq!(value["targetCardsNumber"], 2);
        assert!(value.get("targetCards").is_none());
    }

    #[test]
    fn test_status_messages_use_level_as_type() {
        for (level, tag) in [
            (StatusLevel::Success, "SUCCESS"),
            (StatusLevel::Info, "INFO"),
            (StatusLevel::Warning, "WARNING"),
            (StatusLevel::Error, "ERROR"),
        ] {
            let payload = ServerPayload::status(level, "note");
            assert_eq!(payload.status_level(), Some(level));
            let value = envelope(payload);
            assert_eq!(value["type"], tag);
            assert_eq!(value["content"], "note");
        }
        assert_eq!(ServerPayload::NewRound { timer: 1, round: 1 }.status_level(), None);
    }

    #[test]
    fn test_chat_with_segments() {
        let value = envelope(ServerPayload::Chat {
            username: "System".to_string(),
            user_id: None,
            content: None,
            segments: Some(vec![
                ChatSegment::plain("ada: "),
                ChatSegment::highlighted("2 correct", SegmentKind::Correct),
            ]),
        });
        assert_eq!(value["type"], "CHAT");
        assert!(value.get("content").is_none());
        assert!(value.get("userId").is_none());
        assert_eq!(value["segments"][0], json!({"text": "ada: "}));
        assert_eq!(
            value["segments"][1],
            json!({"text": "2 correct", "kind": "correct"})
        );
    }

    #[test]
    fn test_end_round_field_names() {
        let mut picks = BTreeMap::new();
        picks.insert("p1".to_string(), vec![Card::C10]);
        let mut scores = BTreeMap::new();
        scores.insert("p1".to_string(), -1);

        let value = envelope(ServerPayload::EndRound {
            target_cards: vec![Card::M30],
            picks,
            scores,
        });
        assert_eq!(value["type"], "END_ROUND");
        assert_eq!(value["targetCards"], json!(["M30"]));
        assert_eq!(value["picks"]["p1"], json!(["C10"]));
        assert_eq!(value["scores"]["p1"], -1);
    }

    #[test]
    fn test_round_state_names() {
        assert_eq!(serde_json::to_value(RoundState::Waiting).unwrap(), "waiting");
        assert_eq!(serde_json::to_value(RoundState::Playing).unwrap(), "playing");
        assert_eq!(serde_json::to_value(RoundState::Finished).unwrap(), "finished");
    }
}
