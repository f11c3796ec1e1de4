//! Per-round countdown ticker
//!
//! The timer only produces ticks; the owning game decides what a tick means.
//! Ticks carry the game id and round number so a tick that was already queued
//! when its round ended can be recognised as stale and dropped.

use log::debug;
use shared::GameId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One elapsed second of a playing round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTick {
    pub game_id: GameId,
    pub round: u32,
}

pub type TickSender = mpsc::UnboundedSender<RoundTick>;
pub type TickReceiver = mpsc::UnboundedReceiver<RoundTick>;

/// Cancellable handle to a spawned ticker task
#[derive(Debug, Default)]
pub struct RoundTimer {
    handle: Option<JoinHandle<()>>,
}

impl RoundTimer {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Starts ticking for `round`, replacing any ticker already running
    pub fn start(&mut self, game_id: GameId, round: u32, ticks: TickSender) {
        self.cancel();

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval(TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Skip the first tick since it fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let tick = RoundTick {
                    game_id: game_id.clone(),
                    round,
                };
                if ticks.send(tick).is_err() {
                    debug!("Tick receiver for game {} is gone, stopping timer", game_id);
                    break;
                }
            }
        }));
    }

    /// Stops the ticker; calling it again is a no-op
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_second() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RoundTimer::new();
        timer.start("g1".to_string(), 3, tx);
        assert!(timer.is_active());

        for _ in 0..3 {
            let tick = rx.recv().await.unwrap();
            assert_eq!(
                tick,
                RoundTick {
                    game_id: "g1".to_string(),
                    round: 3
                }
            );
        }
        timer.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_immediate_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RoundTimer::new();
        timer.start("g1".to_string(), 1, tx);

        let early = timeout(Duration::from_millis(900), rx.recv()).await;
        assert!(early.is_err());
        timer.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_stays_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RoundTimer::new();
        timer.start("g1".to_string(), 1, tx);

        assert!(rx.recv().await.is_some());
        timer.cancel();
        assert!(!timer.is_active());

        advance(Duration::from_secs(5)).await;
        let late = timeout(Duration::from_secs(3), rx.recv()).await;
        assert!(!matches!(late, Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_double_cancel_is_noop() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timer = RoundTimer::new();
        timer.start("g1".to_string(), 1, tx);
        timer.cancel();
        timer.cancel();
        assert!(!timer.is_active());

        let mut idle = RoundTimer::default();
        idle.cancel();
        assert!(!idle.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_ticker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RoundTimer::new();
        timer.start("g1".to_string(), 1, tx.clone());
        timer.start("g1".to_string(), 2, tx);

        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap().round, 2);
        }
        timer.cancel();
    }
}
