//! CMYK card arithmetic shared by the server and any client
//!
//! Every card carries ink on exactly one channel at 10%, 30% or 60%. Ink is
//! summed in whole percentage points so that combining cards is exact and
//! independent of order; the floating-point [`Cmyk`] vector is derived from
//! those totals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four ink channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Cyan,
    Magenta,
    Yellow,
    Black,
}

impl Channel {
    fn index(self) -> usize {
        match self {
            Channel::Cyan => 0,
            Channel::Magenta => 1,
            Channel::Yellow => 2,
            Channel::Black => 3,
        }
    }
}

/// A fixed color primitive players can select
///
/// Serialized by name (`"C10"`, `"M60"`, ...), which is also the name shown
/// to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Card {
    C10,
    C30,
    C60,
    M10,
    M30,
    M60,
    Y10,
    Y30,
    Y60,
    K10,
    K30,
    K60,
}

impl Card {
    /// The complete catalog in display order
    pub const ALL: [Card; 12] = [
        Card::C10,
        Card::C30,
        Card::C60,
        Card::M10,
        Card::M30,
        Card::M60,
        Card::Y10,
        Card::Y30,
        Card::Y60,
        Card::K10,
        Card::K30,
        Card::K60,
    ];

    pub fn channel(self) -> Channel {
        match self {
            Card::C10 | Card::C30 | Card::C60 => Channel::Cyan,
            Card::M10 | Card::M30 | Card::M60 => Channel::Magenta,
            Card::Y10 | Card::Y30 | Card::Y60 => Channel::Yellow,
            Card::K10 | Card::K30 | Card::K60 => Channel::Black,
        }
    }

    /// Ink on the card's channel, in percent
    pub fn intensity(self) -> u32 {
        match self {
            Card::C10 | Card::M10 | Card::Y10 | Card::K10 => 10,
            Card::C30 | Card::M30 | Card::Y30 | Card::K30 => 30,
            Card::C60 | Card::M60 | Card::Y60 | Card::K60 => 60,
        }
    }

    pub fn cmyk(self) -> Cmyk {
        combine(&[self])
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Absorption per channel, each nominally in `[0, 1]`
///
/// Values above 1 only appear for oversaturated combinations; they are kept
/// as-is so legality checks can see them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cmyk {
    pub c: f64,
    pub m: f64,
    pub y: f64,
    pub k: f64,
}

impl Cmyk {
    pub fn channels(&self) -> [f64; 4] {
        [self.c, self.m, self.y, self.k]
    }
}

/// Options for [`is_legal_target`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalityOptions {
    /// When false, a target may not hold a cyan, a magenta and a yellow card
    /// of the same intensity (C10 + M10 + Y10 reads as plain grey).
    pub allow_black_mix: bool,
}

impl Default for LegalityOptions {
    fn default() -> Self {
        Self {
            allow_black_mix: true,
        }
    }
}

fn percent_totals<'a>(cards: impl IntoIterator<Item = &'a Card>) -> [u32; 4] {
    let mut totals = [0u32; 4];
    for card in cards {
        totals[card.channel().index()] += card.intensity();
    }
    totals
}

/// Sums the ink of every card, without clamping
pub fn combine<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Cmyk {
    let [c, m, y, k] = percent_totals(cards).map(|p| p as f64 / 100.0);
    Cmyk { c, m, y, k }
}

/// Converts with `channel = 255 * (1 - ink) * (1 - black)`, rounded
pub fn to_rgb(color: &Cmyk) -> [u8; 3] {
    let channel = |ink: f64| -> u8 {
        let value = 255.0 * (1.0 - ink) * (1.0 - color.k);
        value.round().clamp(0.0, 255.0) as u8
    };
    [channel(color.c), channel(color.m), channel(color.y)]
}

/// Uppercase `#RRGGBB`
pub fn to_hex(color: &Cmyk) -> String {
    let [r, g, b] = to_rgb(color);
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

/// Whether a card combination may be used as a round target
pub fn is_legal_target<'a>(
    cards: impl IntoIterator<Item = &'a Card>,
    options: LegalityOptions,
) -> bool {
    let cards: Vec<Card> = cards.into_iter().copied().collect();
    let [c, m, y, k] = percent_totals(&cards);

    if [c, m, y, k].iter().any(|&total| total > 100) {
        return false;
    }

    // Full black swallows every other ink
    if k == 100 && (c > 0 || m > 0 || y > 0) {
        return false;
    }

    if !options.allow_black_mix {
        let intensities = |channel: Channel| -> Vec<u32> {
            cards
                .iter()
                .filter(|card| card.channel() == channel)
                .map(|card| card.intensity())
                .collect()
        };
        let magenta = intensities(Channel::Magenta);
        let yellow = intensities(Channel::Yellow);
        let shared_level = intensities(Channel::Cyan)
            .into_iter()
            .any(|level| magenta.contains(&level) && yellow.contains(&level));
        if shared_level {
            return false;
        }
    }

    true
}
