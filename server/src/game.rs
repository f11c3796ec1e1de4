//! Authoritative game session
//!
//! A [`Game`] owns its roster, its rounds and its round timer. Every operation
//! validates the actor and the current round state first and either returns
//! the messages to deliver or an [`ActionError`] without touching any state.
//! Delivery itself is left to the registry, which knows the connections.

use crate::error::{ActionError, JoinError};
use crate::round::{pick_breakdown, Round, RoundEvent};
use crate::target::random_target;
use crate::timer::{RoundTimer, TickSender};
use crate::utils::{outgoing, status};
use log::{debug, info, warn};
use rand::Rng;
use shared::{
    Card, ChatSegment, ClientMessage, GameConfig, GameId, GameStateView, PlayerId, PlayerView,
    RoundState, SegmentKind, ServerMessage, ServerPayload, StatusLevel,
};
use std::collections::{BTreeMap, VecDeque};

pub const CHAT_HISTORY_LIMIT: usize = 100;
pub const CHAT_MAX_CHARS: usize = 500;
pub const SYSTEM_USERNAME: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    /// Running total; may go negative
    pub score: i32,
}

impl Player {
    fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            name: self.name.clone(),
            is_host: self.is_host,
            score: self.score,
        }
    }
}

/// Where an outbound message should go
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Same message to every connected member
    Broadcast(ServerMessage),
    /// A fresh scoped snapshot to every connected member
    Snapshots,
    /// A fresh scoped snapshot to one member
    SnapshotFor(PlayerId),
}

pub struct Game {
    id: GameId,
    config: GameConfig,
    players: Vec<Player>,
    rounds: Vec<Round>,
    /// Seconds left on the current round's clock
    timer: u32,
    round_timer: RoundTimer,
    ticks: TickSender,
    chat_history: VecDeque<ServerMessage>,
}

impl Game {
    /// Creates an empty game; the registry opens the first round
    pub fn new(id: GameId, config: GameConfig, ticks: TickSender) -> Self {
        let timer = config.timer_duration;
        Self {
            id,
            config,
            players: Vec::new(),
            rounds: Vec::new(),
            timer,
            round_timer: RoundTimer::new(),
            ticks,
            chat_history: VecDeque::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.player(player_id).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.max_players as usize
    }

    /// 1-based index of the current round, 0 before the first one exists
    pub fn round_number(&self) -> u32 {
        self.rounds.len() as u32
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn has_active_timer(&self) -> bool {
        self.round_timer.is_active()
    }

    /// True once the first round has left `waiting`
    pub fn has_started(&self) -> bool {
        self.rounds
            .first()
            .map_or(false, |round| round.state() != RoundState::Waiting)
    }

    pub fn chat_history(&self) -> impl Iterator<Item = &ServerMessage> {
        self.chat_history.iter()
    }

    /// Adds a player, or returns the existing one unchanged
    ///
    /// The first player to join becomes the host.
    pub fn add_player(&mut self, player_id: &str, name: &str) -> Result<&Player, JoinError> {
        if let Some(index) = self.players.iter().position(|p| p.id == player_id) {
            return Ok(&self.players[index]);
        }
        if self.is_full() {
            return Err(JoinError::GameFull);
        }

        let is_host = self.players.is_empty();
        self.players.push(Player {
            id: player_id.to_string(),
            name: name.to_string(),
            is_host,
            score: 0,
        });
        info!(
            "Player {} ({}) joined game {}{}",
            name,
            player_id,
            self.id,
            if is_host { " as host" } else { "" }
        );

        let index = self.players.len() - 1;
        Ok(&self.players[index])
    }

    /// Appends a waiting round with a fresh random target
    pub fn create_round(&mut self) -> Result<u32, ActionError> {
        self.create_round_with(&mut rand::thread_rng())
    }

    pub fn create_round_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<u32, ActionError> {
        if self.round_number() >= self.config.max_rounds {
            return Err(ActionError::MaxRoundsReached);
        }
        if let Some(previous) = self.rounds.last() {
            if previous.state() != RoundState::Finished {
                return Err(ActionError::PreviousRoundUnfinished);
            }
        }

        let target = random_target(
            &Card::ALL,
            self.config.min_cards,
            self.config.max_cards,
            self.config.legality,
            rng,
        )?;
        self.rounds.push(Round::new(target));
        self.timer = self.config.timer_duration;

        info!("Game {} opened round {}", self.id, self.round_number());
        Ok(self.round_number())
    }

    /// Routes one client message to the matching operation
    pub fn handle_message(
        &mut self,
        actor: &str,
        message: ClientMessage,
    ) -> Result<Vec<Dispatch>, ActionError> {
        match message {
            ClientMessage::Chat { content } => self.chat(actor, &content),
            ClientMessage::CardsPicked { cards } => self.submit_picks(actor, cards),
            ClientMessage::StartRound => self.start_round(actor),
            ClientMessage::NewRound => self.new_round(actor),
        }
    }

    /// Host opens the next round
    pub fn new_round(&mut self, actor: &str) -> Result<Vec<Dispatch>, ActionError> {
        self.require_host(actor, "open a new round")?;
        let round = self.create_round()?;

        let payload = ServerPayload::NewRound {
            timer: self.timer,
            round,
        };
        Ok(vec![Dispatch::Broadcast(outgoing(payload)), Dispatch::Snapshots])
    }

    /// Host starts the countdown of the waiting round
    pub fn start_round(&mut self, actor: &str) -> Result<Vec<Dispatch>, ActionError> {
        self.require_host(actor, "start a round")?;

        let number = self.round_number();
        let round = self.rounds.last_mut().ok_or(ActionError::NoRound)?;
        round.apply(RoundEvent::Start)?;

        let payload = ServerPayload::StartRound {
            target_color: round.target_color().to_string(),
            target_cards_number: round.target_cards().len(),
        };

        self.timer = self.config.timer_duration;
        self.round_timer
            .start(self.id.clone(), number, self.ticks.clone());
        info!(
            "Game {} started round {} ({}s)",
            self.id, number, self.timer
        );

        Ok(vec![Dispatch::Broadcast(outgoing(payload)), Dispatch::Snapshots])
    }

    /// Replaces the actor's picks for the playing round
    ///
    /// Submissions are not checked for legality; any subset is accepted.
    pub fn submit_picks(
        &mut self,
        actor: &str,
        cards: Vec<Card>,
    ) -> Result<Vec<Dispatch>, ActionError> {
        if !self.is_member(actor) {
            return Err(ActionError::UnknownPlayer(actor.to_string()));
        }
        let round = self.rounds.last_mut().ok_or(ActionError::NoRound)?;
        if !round.set_picks(actor, cards) {
            return Err(ActionError::RoundNotPlaying);
        }

        debug!("Player {} updated picks in game {}", actor, self.id);
        Ok(vec![Dispatch::SnapshotFor(actor.to_string())])
    }

    /// Broadcasts a chat line from a member
    pub fn chat(&mut self, actor: &str, content: &str) -> Result<Vec<Dispatch>, ActionError> {
        let player = self
            .player(actor)
            .ok_or_else(|| ActionError::UnknownPlayer(actor.to_string()))?;

        let content = content.trim();
        if content.is_empty() {
            return Err(ActionError::EmptyChat);
        }
        if content.chars().count() > CHAT_MAX_CHARS {
            return Err(ActionError::ChatTooLong(CHAT_MAX_CHARS));
        }

        let message = outgoing(ServerPayload::Chat {
            username: player.name.clone(),
            user_id: Some(player.id.clone()),
            content: Some(content.to_string()),
            segments: None,
        });
        self.remember_chat(message.clone());
        Ok(vec![Dispatch::Broadcast(message)])
    }

    /// Advances the clock of round `round` by one second
    ///
    /// Ticks for any other round, or for a round that is not playing, are
    /// stale and ignored.
    pub fn tick(&mut self, round: u32) -> Vec<Dispatch> {
        let playing = self
            .current_round()
            .map_or(false, |current| current.state() == RoundState::Playing);
        if round != self.round_number() || !playing {
            debug!(
                "Ignoring stale tick for round {} of game {}",
                round, self.id
            );
            return Vec::new();
        }

        self.timer = self.timer.saturating_sub(1);
        if self.timer > 0 {
            return vec![Dispatch::Broadcast(outgoing(ServerPayload::TimerUpdate {
                timer: self.timer,
            }))];
        }

        self.end_round()
    }

    /// Finishes the playing round, scores it and reports the result
    fn end_round(&mut self) -> Vec<Dispatch> {
        self.round_timer.cancel();

        let Some(round) = self.rounds.last_mut() else {
            return Vec::new();
        };
        if let Err(e) = round.apply(RoundEvent::Expire) {
            warn!("Game {} could not end round: {}", self.id, e);
            return Vec::new();
        }

        let mut scores = BTreeMap::new();
        let mut summaries = Vec::with_capacity(self.players.len());
        for player in self.players.iter_mut() {
            let delta = round.score_for(&player.id);
            player.score += delta;
            scores.insert(player.id.clone(), player.score);

            let (correct, wrong) = round
                .picks_of(&player.id)
                .map(|picks| pick_breakdown(round.target_cards(), picks))
                .unwrap_or((0, 0));
            summaries.push(outgoing(ServerPayload::Chat {
                username: SYSTEM_USERNAME.to_string(),
                user_id: None,
                content: None,
                segments: Some(vec![
                    ChatSegment::plain(format!("{}: ", player.name)),
                    ChatSegment::highlighted(format!("{} correct", correct), SegmentKind::Correct),
                    ChatSegment::plain(", "),
                    ChatSegment::highlighted(format!("{} wrong", wrong), SegmentKind::Wrong),
                ]),
            }));
        }

        let end = ServerPayload::EndRound {
            target_cards: round.target_cards().iter().copied().collect(),
            picks: round
                .picks()
                .iter()
                .map(|(id, cards)| (id.clone(), cards.iter().copied().collect()))
                .collect(),
            scores,
        };

        info!("Game {} finished round {}", self.id, self.round_number());

        let mut dispatches = vec![Dispatch::Broadcast(outgoing(end))];
        for summary in summaries {
            self.remember_chat(summary.clone());
            dispatches.push(Dispatch::Broadcast(summary));
        }
        dispatches.push(Dispatch::Snapshots);

        if self.round_number() >= self.config.max_rounds {
            info!("Game {} is over", self.id);
            dispatches.push(Dispatch::Broadcast(status(StatusLevel::Info, "Game over")));
        }

        dispatches
    }

    /// Full game state as `viewer` may see it
    pub fn snapshot(&self, viewer: &str) -> GameStateView {
        GameStateView {
            game_id: self.id.clone(),
            game_title: self.config.title.clone(),
            players: self.players.iter().map(Player::view).collect(),
            timer: self.timer,
            timer_duration: self.config.timer_duration,
            min_cards: self.config.min_cards,
            max_cards: self.config.max_cards,
            max_players: self.config.max_players,
            max_rounds: self.config.max_rounds,
            with_invite_code: self.config.invite_code.is_some(),
            round: self.round_number(),
            rounds: self.rounds.iter().map(|round| round.view(viewer)).collect(),
        }
    }

    pub fn snapshot_message(&self, viewer: &str) -> ServerMessage {
        outgoing(ServerPayload::GameState {
            game_state: self.snapshot(viewer),
            player_id: viewer.to_string(),
        })
    }

    fn require_host(&self, actor: &str, action: &'static str) -> Result<(), ActionError> {
        let player = self
            .player(actor)
            .ok_or_else(|| ActionError::UnknownPlayer(actor.to_string()))?;
        if !player.is_host {
            return Err(ActionError::NotHost(action));
        }
        Ok(())
    }

    fn remember_chat(&mut self, message: ServerMessage) {
        if self.chat_history.len() == CHAT_HISTORY_LIMIT {
            self.chat_history.pop_front();
        }
        self.chat_history.push_back(message);
    }
}
