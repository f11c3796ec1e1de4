//! # Game Server Library
//!
//! This library provides the authoritative server for the CMYK card party
//! game. Players join a game, are shown a target color mixed from a secret set
//! of cards, and race a countdown to pick the same cards.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Sessions
//! The server owns every game: the roster, the rounds, the targets, the picks
//! and the scores. Clients only send intents (chat, picks, start, next round)
//! and receive the outcome.
//!
//! ### Connection Management
//! Handles the lifecycle of WebSocket connections:
//! - Token verification and admission into a game
//! - One live connection per player and game; a newer login replaces the older
//! - Disconnection without losing the player's seat or score
//!
//! ### State Broadcasting
//! Every change a player should see is pushed to all connected members, with
//! snapshots scoped per player so that targets and other players' picks stay
//! hidden until a round is over.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! Network tasks and round timers only produce events. One loop consumes them
//! and is the sole owner of the [`registry::SessionRegistry`], so session
//! operations never race and a pick that arrives before the final tick of a
//! round always counts.
//!
//! ### Explicit Round State Machine
//! Rounds move `waiting -> playing -> finished` through a pure transition
//! function in [`round`]. Rejected transitions leave state untouched.
//!
//! ## Module Organization
//!
//! - [`target`]: random legal targets by rejection sampling
//! - [`round`]: a single round, its transitions and scoring
//! - [`timer`]: the cancellable one-second round ticker
//! - [`game`]: the session aggregate and all session operations
//! - [`auth`]: identity tokens and the known-user directory
//! - [`registry`]: games by id, admission and connection bookkeeping
//! - [`network`]: WebSocket transport and the main loop
//! - [`error`]: error types
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::auth::{TokenAuthenticator, UserDirectory};
//! use server::network::Server;
//! use shared::{CreateGameRequest, LegalityOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let users: UserDirectory = [("1", "ada"), ("2", "grace")].into_iter().collect();
//!     let mut server = Server::bind(
//!         "127.0.0.1:8080",
//!         users,
//!         TokenAuthenticator::new("change-me")?,
//!         LegalityOptions::default(),
//!     )
//!     .await?;
//!
//!     let request = CreateGameRequest {
//!         game_title: "Friday Night".to_string(),
//!         max_players: 4,
//!         timer_duration: 30,
//!         min_cards: 2,
//!         max_cards: 4,
//!         max_rounds: 5,
//!         invite_code: None,
//!     };
//!     server.registry_mut().create_game(Some("friday".to_string()), &request)?;
//!
//!     // Clients connect to ws://127.0.0.1:8080/?token=<token>&gameId=friday
//!     server.run().await
//! }
//! ```

pub mod auth;
pub mod error;
pub mod game;
pub mod network;
pub mod registry;
pub mod round;
pub mod target;
pub mod timer;
pub mod utils;
