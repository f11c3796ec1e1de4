//! Types shared by the game server and its clients
//!
//! - [`color`]: the card catalog and CMYK arithmetic
//! - [`protocol`]: inbound and outbound JSON messages and snapshot views
//! - [`game_config`]: the game creation payload and its bounds

pub mod color;
pub mod game_config;
pub mod protocol;

pub use color::{combine, is_legal_target, to_hex, to_rgb, Card, Channel, Cmyk, LegalityOptions};
pub use game_config::{CreateGameRequest, GameConfig, ValidationError};
pub use protocol::{
    ChatSegment, ClientMessage, GameId, GameStateView, PlayerId, PlayerView, RoundState,
    RoundView, SegmentKind, ServerMessage, ServerPayload, StatusLevel,
};
