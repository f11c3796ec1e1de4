//! Session registry and connection bookkeeping
//!
//! The registry owns every [`Game`] and knows which connection belongs to
//! which (game, player) pair. It is the admission gate in front of the games:
//! connections are checked here, and games only ever see player ids.
//!
//! Each connection has an outbox drained by its writer task. Sending is best
//! effort; a closed outbox means the socket is already gone.

use crate::auth::UserDirectory;
use crate::error::{AdmissionError, JoinError, RegistryError};
use crate::game::{Dispatch, Game};
use crate::timer::{RoundTick, TickSender};
use crate::utils::status;
use log::{debug, error, info, warn};
use shared::{
    ClientMessage, CreateGameRequest, GameId, GameStateView, LegalityOptions, PlayerId,
    ServerMessage, StatusLevel,
};
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const SUPERSEDED_NOTICE: &str =
    "You have been disconnected because you logged in from another device.";
pub const CONNECTED_NOTICE: &str = "Successfully connected to the game server.";

pub type ConnectionId = u64;

/// Instructions for a connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Message(ServerMessage),
    Close,
}

pub type Outbox = mpsc::UnboundedSender<Outgoing>;

#[derive(Debug)]
struct Connection {
    id: ConnectionId,
    outbox: Outbox,
}

fn send(outbox: &Outbox, outgoing: Outgoing) {
    if outbox.send(outgoing).is_err() {
        debug!("Dropping message for a closed connection");
    }
}

/// Sends one status message and asks the writer to close the socket
fn reject(outbox: &Outbox, content: String) {
    send(outbox, Outgoing::Message(status(StatusLevel::Error, content)));
    send(outbox, Outgoing::Close);
}

pub struct SessionRegistry {
    games: HashMap<GameId, Game>,
    /// Live connection per player, per game
    connections: HashMap<GameId, HashMap<PlayerId, Connection>>,
    routes: HashMap<ConnectionId, (GameId, PlayerId)>,
    users: UserDirectory,
    ticks: TickSender,
    legality: LegalityOptions,
}

impl SessionRegistry {
    pub fn new(users: UserDirectory, ticks: TickSender, legality: LegalityOptions) -> Self {
        Self {
            games: HashMap::new(),
            connections: HashMap::new(),
            routes: HashMap::new(),
            users,
            ticks,
            legality,
        }
    }

    /// Validates `request` and opens a game with its first round waiting
    ///
    /// A random id is generated when none is given.
    pub fn create_game(
        &mut self,
        game_id: Option<GameId>,
        request: &CreateGameRequest,
    ) -> Result<GameId, RegistryError> {
        let config = request.validate()?.with_legality(self.legality);
        let game_id = game_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.games.contains_key(&game_id) {
            return Err(RegistryError::DuplicateGame(game_id));
        }

        let mut game = Game::new(game_id.clone(), config, self.ticks.clone());
        game.create_round()?;

        info!("Created game {} ({})", game_id, request.game_title);
        self.games.insert(game_id.clone(), game);
        Ok(game_id)
    }

    pub fn game(&self, game_id: &str) -> Option<&Game> {
        self.games.get(game_id)
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn is_connected(&self, game_id: &str, player_id: &str) -> bool {
        self.connections
            .get(game_id)
            .map_or(false, |room| room.contains_key(player_id))
    }

    pub fn connection_count(&self, game_id: &str) -> usize {
        self.connections.get(game_id).map_or(0, HashMap::len)
    }

    /// Snapshots of every game `player_id` belongs to, ordered by game id
    pub fn games_for_player(&self, player_id: &str) -> Vec<GameStateView> {
        let mut games: Vec<&Game> = self
            .games
            .values()
            .filter(|game| game.is_member(player_id))
            .collect();
        games.sort_by(|a, b| a.id().cmp(b.id()));
        games.iter().map(|game| game.snapshot(player_id)).collect()
    }

    fn admit(
        &self,
        identity: Option<&str>,
        game_id: Option<&str>,
    ) -> Result<(PlayerId, GameId, String), AdmissionError> {
        if self.users.is_empty() {
            return Err(AdmissionError::NoUsers);
        }
        let player_id = identity.ok_or(AdmissionError::Unauthenticated)?;
        let username = self
            .users
            .username(player_id)
            .ok_or(AdmissionError::UnknownUser)?;
        let game_id = game_id.ok_or(AdmissionError::MissingGameId)?;
        let game = self.games.get(game_id).ok_or(AdmissionError::GameNotFound)?;

        // Existing members may always come back
        if !game.is_member(player_id) {
            if game.is_full() {
                return Err(AdmissionError::GameFull);
            }
            if game.has_started() {
                return Err(AdmissionError::AlreadyStarted);
            }
        }

        Ok((
            player_id.to_string(),
            game_id.to_string(),
            username.to_string(),
        ))
    }

    /// Admits a new connection or turns it away
    ///
    /// On success the player is on the roster, any previous connection of the
    /// same player to this game has been closed, and the newcomer has been
    /// sent a greeting, a snapshot and the chat history.
    pub fn connect(
        &mut self,
        conn_id: ConnectionId,
        identity: Option<PlayerId>,
        game_id: Option<GameId>,
        outbox: Outbox,
    ) -> Result<(), AdmissionError> {
        let (player_id, game_id, username) =
            match self.admit(identity.as_deref(), game_id.as_deref()) {
                Ok(admitted) => admitted,
                Err(e) => {
                    warn!("Rejected connection {}: {}", conn_id, e);
                    reject(&outbox, e.to_string());
                    return Err(e);
                }
            };

        let Some(game) = self.games.get_mut(&game_id) else {
            reject(&outbox, AdmissionError::GameNotFound.to_string());
            return Err(AdmissionError::GameNotFound);
        };
        if let Err(JoinError::GameFull) = game.add_player(&player_id, &username) {
            warn!("Rejected connection {}: game {} is full", conn_id, game_id);
            reject(&outbox, AdmissionError::GameFull.to_string());
            return Err(AdmissionError::GameFull);
        }

        let room = self.connections.entry(game_id.clone()).or_default();
        let previous = room.insert(
            player_id.clone(),
            Connection {
                id: conn_id,
                outbox: outbox.clone(),
            },
        );
        if let Some(previous) = previous {
            info!(
                "Player {} reconnected to game {}, closing connection {}",
                player_id, game_id, previous.id
            );
            reject(&previous.outbox, SUPERSEDED_NOTICE.to_string());
            self.routes.remove(&previous.id);
        }
        self.routes
            .insert(conn_id, (game_id.clone(), player_id.clone()));
        info!(
            "Player {} connected to game {} on connection {}",
            player_id, game_id, conn_id
        );

        send(
            &outbox,
            Outgoing::Message(status(StatusLevel::Success, CONNECTED_NOTICE)),
        );
        self.deliver(&game_id, vec![Dispatch::Snapshots]);
        if let Some(game) = self.games.get(&game_id) {
            for message in game.chat_history() {
                send(&outbox, Outgoing::Message(message.clone()));
            }
        }

        Ok(())
    }

    /// Routes one inbound message to the game behind the connection
    ///
    /// Rejections never close the connection. Capacity boundaries and
    /// internal failures are reported to the sender; protocol violations are
    /// only logged.
    pub fn handle_message(&mut self, conn_id: ConnectionId, message: ClientMessage) {
        let Some((game_id, player_id)) = self.routes.get(&conn_id).cloned() else {
            warn!("Dropping message from unadmitted connection {}", conn_id);
            return;
        };
        let Some(game) = self.games.get_mut(&game_id) else {
            warn!("Connection {} points at missing game {}", conn_id, game_id);
            return;
        };

        match game.handle_message(&player_id, message) {
            Ok(dispatches) => self.deliver(&game_id, dispatches),
            Err(e) => match e.notice() {
                Some((level, content)) => {
                    if level == StatusLevel::Error {
                        error!("Game {}: {}", game_id, e);
                    } else {
                        info!("Game {}: {}", game_id, e);
                    }
                    self.send_to(&game_id, &player_id, status(level, content));
                }
                None => {
                    warn!(
                        "Dropping message from {} in game {}: {}",
                        player_id, game_id, e
                    );
                }
            },
        }
    }

    pub fn handle_tick(&mut self, tick: RoundTick) {
        let Some(game) = self.games.get_mut(&tick.game_id) else {
            debug!("Tick for unknown game {}", tick.game_id);
            return;
        };
        let dispatches = game.tick(tick.round);
        self.deliver(&tick.game_id, dispatches);
    }

    /// Forgets a closed connection; the player stays on the roster
    pub fn disconnect(&mut self, conn_id: ConnectionId) {
        let Some((game_id, player_id)) = self.routes.remove(&conn_id) else {
            debug!("Connection {} closed without a live route", conn_id);
            return;
        };
        if let Some(room) = self.connections.get_mut(&game_id) {
            // A replacement connection keeps its entry
            if room.get(&player_id).map_or(false, |c| c.id == conn_id) {
                room.remove(&player_id);
                info!("Player {} left game {}", player_id, game_id);
            }
        }
    }

    fn send_to(&self, game_id: &str, player_id: &str, message: ServerMessage) {
        if let Some(connection) = self
            .connections
            .get(game_id)
            .and_then(|room| room.get(player_id))
        {
            send(&connection.outbox, Outgoing::Message(message));
        }
    }

    fn deliver(&self, game_id: &str, dispatches: Vec<Dispatch>) {
        let (Some(game), Some(room)) = (self.games.get(game_id), self.connections.get(game_id))
        else {
            return;
        };

        for dispatch in dispatches {
            match dispatch {
                Dispatch::Broadcast(message) => {
                    for connection in room.values() {
                        send(&connection.outbox, Outgoing::Message(message.clone()));
                    }
                }
                Dispatch::Snapshots => {
                    for (player_id, connection) in room {
                        send(
                            &connection.outbox,
                            Outgoing::Message(game.snapshot_message(player_id)),
                        );
                    }
                }
                Dispatch::SnapshotFor(player_id) => {
                    if let Some(connection) = room.get(&player_id) {
                        send(
                            &connection.outbox,
                            Outgoing::Message(game.snapshot_message(&player_id)),
                        );
                    }
                }
            }
        }
    }
}
