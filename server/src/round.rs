//! One timed challenge: target, picks and lifecycle

use crate::error::TransitionError;
use shared::{combine, to_hex, Card, PlayerId, RoundState, RoundView};
use std::collections::{BTreeMap, BTreeSet};

/// Inputs that move a round through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// Host started the countdown
    Start,
    /// Countdown reached zero
    Expire,
}

/// Transition table for rounds
///
/// Only `waiting -> playing -> finished` is allowed. Every other pairing is
/// rejected and leaves the caller's state untouched.
pub fn transition(state: RoundState, event: RoundEvent) -> Result<RoundState, TransitionError> {
    match (state, event) {
        (RoundState::Waiting, RoundEvent::Start) => Ok(RoundState::Playing),
        (RoundState::Playing, RoundEvent::Expire) => Ok(RoundState::Finished),
        (from, event) => Err(TransitionError { from, event }),
    }
}

/// Points for one pick set: correct cards minus incorrect cards
pub fn score_delta(target: &BTreeSet<Card>, picks: &BTreeSet<Card>) -> i32 {
    picks.iter().fold(0, |delta, card| {
        if target.contains(card) {
            delta + 1
        } else {
            delta - 1
        }
    })
}

/// Correct and incorrect counts for one pick set
pub fn pick_breakdown(target: &BTreeSet<Card>, picks: &BTreeSet<Card>) -> (usize, usize) {
    let correct = picks.intersection(target).count();
    (correct, picks.len() - correct)
}

#[derive(Debug, Clone)]
pub struct Round {
    target_cards: BTreeSet<Card>,
    target_color: String,
    picks: BTreeMap<PlayerId, BTreeSet<Card>>,
    state: RoundState,
}

impl Round {
    /// Creates a waiting round; the hex color is computed once here
    pub fn new(target_cards: BTreeSet<Card>) -> Self {
        let target_color = to_hex(&combine(&target_cards));
        Self {
            target_cards,
            target_color,
            picks: BTreeMap::new(),
            state: RoundState::Waiting,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn target_cards(&self) -> &BTreeSet<Card> {
        &self.target_cards
    }

    pub fn target_color(&self) -> &str {
        &self.target_color
    }

    pub fn picks(&self) -> &BTreeMap<PlayerId, BTreeSet<Card>> {
        &self.picks
    }

    pub fn picks_of(&self, player_id: &str) -> Option<&BTreeSet<Card>> {
        self.picks.get(player_id)
    }

    /// Applies `event`, leaving the round unchanged on rejection
    pub fn apply(&mut self, event: RoundEvent) -> Result<RoundState, TransitionError> {
        self.state = transition(self.state, event)?;
        Ok(self.state)
    }

    /// Replaces the player's pick set; returns false unless the round is playing
    pub fn set_picks(&mut self, player_id: &str, cards: impl IntoIterator<Item = Card>) -> bool {
        if self.state != RoundState::Playing {
            return false;
        }
        self.picks
            .insert(player_id.to_string(), cards.into_iter().collect());
        true
    }

    /// Score delta for `player_id`; zero when nothing was submitted
    pub fn score_for(&self, player_id: &str) -> i32 {
        self.picks
            .get(player_id)
            .map(|picks| score_delta(&self.target_cards, picks))
            .unwrap_or(0)
    }

    /// The round as `viewer` may see it
    ///
    /// Target identities and other players' picks stay hidden until the round
    /// is finished. The color and card count appear once the round is playing.
    pub fn view(&self, viewer: &str) -> RoundView {
        let finished = self.state == RoundState::Finished;
        let revealed = self.state != RoundState::Waiting;

        let picks = self
            .picks
            .iter()
            .filter(|(player_id, _)| finished || player_id.as_str() == viewer)
            .map(|(player_id, cards)| (player_id.clone(), cards.iter().copied().collect()))
            .collect();

        RoundView {
            state: self.state,
            picks,
            target_cards: finished.then(|| self.target_cards.iter().copied().collect()),
            target_color: revealed.then(|| self.target_color.clone()),
            target_cards_number: revealed.then(|| self.target_cards.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn target() -> BTreeSet<Card> {
        [Card::C10, Card::M30].into_iter().collect()
    }

    fn playing_round() -> Round {
        let mut round = Round::new(target());
        assert_ok!(round.apply(RoundEvent::Start));
        round
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(
            transition(RoundState::Waiting, RoundEvent::Start),
            Ok(RoundState::Playing)
        );
        assert_eq!(
            transition(RoundState::Playing, RoundEvent::Expire),
            Ok(RoundState::Finished)
        );

        let rejected = [
            (RoundState::Waiting, RoundEvent::Expire),
            (RoundState::Playing, RoundEvent::Start),
            (RoundState::Finished, RoundEvent::Start),
            (RoundState::Finished, RoundEvent::Expire),
        ];
        for (from, event) in rejected {
            assert_eq!(
                transition(from, event),
                Err(TransitionError { from, event })
            );
        }
    }

    #[test]
    fn test_new_round_caches_color() {
        let round = Round::new(target());
        assert_eq!(round.state(), RoundState::Waiting);
        assert_eq!(round.target_color(), to_hex(&combine(&target())));
        assert!(round.picks().is_empty());
    }

    #[test]
    fn test_second_start_leaves_round_unchanged() {
        let mut round = playing_round();
        assert_err!(round.apply(RoundEvent::Start));
        assert_eq!(round.state(), RoundState::Playing);
    }

    #[test]
    fn test_picks_rejected_while_waiting() {
        let mut round = Round::new(target());
        assert!(!round.set_picks("p1", [Card::C10]));
        assert!(round.picks().is_empty());
    }

    #[test]
    fn test_picks_rejected_after_finish() {
        let mut round = playing_round();
        assert_ok!(round.apply(RoundEvent::Expire));
        assert!(!round.set_picks("p1", [Card::C10]));
        assert!(round.picks_of("p1").is_none());
    }

    #[test]
    fn test_resubmission_replaces_picks() {
        let mut round = playing_round();
        assert!(round.set_picks("p1", [Card::C10, Card::Y60]));
        assert!(round.set_picks("p1", [Card::M30]));
        let picks: Vec<Card> = round.picks_of("p1").unwrap().iter().copied().collect();
        assert_eq!(picks, vec![Card::M30]);
    }

    #[test]
    fn test_illegal_submissions_are_accepted() {
        let mut round = playing_round();
        assert!(round.set_picks("p1", [Card::C30, Card::C60, Card::K60]));
        assert_eq!(round.picks_of("p1").map(|p| p.len()), Some(3));
    }

    #[test]
    fn test_score_delta() {
        let picks = [Card::C10, Card::M30, Card::Y60].into_iter().collect();
        assert_eq!(score_delta(&target(), &picks), 1);
        assert_eq!(pick_breakdown(&target(), &picks), (2, 1));

        let wrong = [Card::K10, Card::K30, Card::K60].into_iter().collect();
        assert_eq!(score_delta(&target(), &wrong), -3);

        assert_eq!(score_delta(&target(), &BTreeSet::new()), 0);
    }

    #[test]
    fn test_score_for_absent_player_is_zero() {
        let mut round = playing_round();
        round.set_picks("p1", [Card::C10]);
        assert_eq!(round.score_for("p1"), 1);
        assert_eq!(round.score_for("p2"), 0);
    }

    #[test]
    fn test_view_hides_until_revealed() {
        let round = Round::new(target());
        let view = round.view("p1");
        assert_eq!(view.state, RoundState::Waiting);
        assert!(view.target_cards.is_none());
        assert!(view.target_color.is_none());
        assert!(view.target_cards_number.is_none());
    }

    #[test]
    fn test_view_while_playing_shows_only_own_picks() {
        let mut round = playing_round();
        round.set_picks("p1", [Card::C10]);
        round.set_picks("p2", [Card::M30]);

        let view = round.view("p1");
        assert_eq!(view.target_color.as_deref(), Some(round.target_color()));
        assert_eq!(view.target_cards_number, Some(2));
        assert!(view.target_cards.is_none());
        assert_eq!(view.picks.len(), 1);
        assert_eq!(view.picks["p1"], vec![Card::C10]);
    }

    #[test]
    fn test_view_after_finish_reveals_everything() {
        let mut round = playing_round();
        round.set_picks("p1", [Card::C10]);
        round.set_picks("p2", [Card::M30]);
        assert_ok!(round.apply(RoundEvent::Expire));

        let view = round.view("p1");
        assert_eq!(view.target_cards, Some(vec![Card::C10, Card::M30]));
        assert_eq!(view.picks.len(), 2);
    }
}
