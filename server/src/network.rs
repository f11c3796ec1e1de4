//! Server network layer handling WebSocket connections and the event loop
//!
//! Every socket gets a reader task and a writer task. Readers decode frames
//! into [`ClientMessage`]s and forward them to the main loop as
//! [`ServerEvent`]s; writers drain the connection's outbox. The main loop is
//! the only place the [`SessionRegistry`] is touched, so all game state is
//! mutated from a single task and messages from one connection are handled in
//! the order they arrived.

use crate::auth::{TokenAuthenticator, UserDirectory};
use crate::registry::{ConnectionId, Outbox, Outgoing, SessionRegistry};
use crate::timer::TickReceiver;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientMessage, GameId, LegalityOptions, PlayerId};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use url::form_urlencoded;

pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        conn_id: ConnectionId,
        token: Option<String>,
        game_id: Option<GameId>,
        outbox: Outbox,
    },
    MessageReceived {
        conn_id: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        conn_id: ConnectionId,
    },
    Shutdown,
}

/// Decodes `a=1&b=my%20game` into pairs, dropping empty values
pub fn query_params(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.as_bytes())
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Main server owning the registry and coordinating network tasks
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    registry: SessionRegistry,
    auth: TokenAuthenticator,

    // Communication channels
    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
    tick_rx: TickReceiver,
}

impl Server {
    pub async fn bind(
        addr: &str,
        users: UserDirectory,
        auth: TokenAuthenticator,
        legality: LegalityOptions,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            registry: SessionRegistry::new(users, tick_tx, legality),
            auth,
            event_tx,
            event_rx,
            tick_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registry access for seeding games before [`Server::run`]
    pub fn registry_mut(&mut self) -> &mut SessionRegistry {
        &mut self.registry
    }

    /// Handle for injecting events, e.g. [`ServerEvent::Shutdown`]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<ServerEvent> {
        self.event_tx.clone()
    }

    /// Spawns task that accepts sockets and hands each to its own task
    fn spawn_acceptor(&self, listener: TcpListener) {
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut next_id: ConnectionId = 0;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        next_id += 1;
                        debug!("Accepted TCP connection {} from {}", next_id, addr);
                        tokio::spawn(handle_connection(stream, addr, next_id, event_tx.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn identify(&self, conn_id: ConnectionId, token: Option<String>) -> Option<PlayerId> {
        let token = token?;
        match self.auth.verify(&token) {
            Ok(player_id) => Some(player_id),
            Err(e) => {
                warn!("Connection {} presented a bad token: {}", conn_id, e);
                None
            }
        }
    }

    fn handle_event(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::Connected {
                conn_id,
                token,
                game_id,
                outbox,
            } => {
                let identity = self.identify(conn_id, token);
                if let Err(e) = self.registry.connect(conn_id, identity, game_id, outbox) {
                    debug!("Connection {} not admitted: {}", conn_id, e);
                }
            }
            ServerEvent::MessageReceived { conn_id, message } => {
                self.registry.handle_message(conn_id, message);
            }
            ServerEvent::Disconnected { conn_id } => {
                self.registry.disconnect(conn_id);
            }
            ServerEvent::Shutdown => return false,
        }
        true
    }

    /// Main server loop; returns after [`ServerEvent::Shutdown`]
    pub async fn run(mut self) -> Result<(), ServerError> {
        let listener = self
            .listener
            .take()
            .ok_or("server listener already consumed")?;
        self.spawn_acceptor(listener);

        info!(
            "Server started successfully with {} game(s)",
            self.registry.game_count()
        );

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => {
                            if !self.handle_event(event) {
                                info!("Server shutting down");
                                break;
                            }
                        }
                        None => break,
                    }
                },

                Some(tick) = self.tick_rx.recv() => {
                    self.registry.handle_tick(tick);
                },
            }
        }

        Ok(())
    }
}

/// Runs one socket from handshake to close
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    conn_id: ConnectionId,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    // Identity and game travel in the upgrade request's query string
    let mut query = None;
    let handshake = tokio_tungstenite::accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            query = request.uri().query().map(str::to_string);
            Ok(response)
        },
    );
    let socket = match handshake.await {
        Ok(socket) => socket,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let params = query_params(query.as_deref().unwrap_or_default());
    let (mut sink, mut frames) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<Outgoing>();

    let connected = ServerEvent::Connected {
        conn_id,
        token: params.get("token").cloned(),
        game_id: params.get("gameId").cloned(),
        outbox,
    };
    if events.send(connected).is_err() {
        error!("Server loop is gone, dropping connection from {}", addr);
        return;
    }

    // Writer ends on Close or once the registry drops the outbox
    tokio::spawn(async move {
        while let Some(outgoing) = outbox_rx.recv().await {
            match outgoing {
                Outgoing::Message(message) => {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        debug!("Failed to send to connection {}: {}", conn_id, e);
                        break;
                    }
                }
                Outgoing::Close => {
                    if let Err(e) = sink.close().await {
                        debug!("Failed to close connection {}: {}", conn_id, e);
                    }
                    break;
                }
            }
        }
    });

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => {
                    if events
                        .send(ServerEvent::MessageReceived { conn_id, message })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => warn!("Malformed message from {}: {}", addr, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => debug!("Ignoring non-text frame from {}", addr),
            Err(e) => {
                debug!("Connection {} errored: {}", conn_id, e);
                break;
            }
        }
    }

    debug!("Connection {} from {} closed", conn_id, addr);
    if events.send(ServerEvent::Disconnected { conn_id }).is_err() {
        debug!("Server loop is gone");
    }
}
