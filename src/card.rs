//! Playing cards and the per-room deck they are dealt from.
//!
//! Grounded in `original_source/backend/server.py`'s `CardDeck`: a 52-card
//! deck that is shuffled again on every single deal, not just once up front.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One of the four standard suits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    Spades,
    Hearts,
    Clubs,
    Diamonds,
}

impl Suit {
    const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Clubs, Suit::Diamonds];

    fn code(self) -> char {
        match self {
            Suit::Spades => 'S',
            Suit::Hearts => 'H',
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
        }
    }

    fn from_code(c: char) -> Option<Suit> {
        match c {
            'S' => Some(Suit::Spades),
            'H' => Some(Suit::Hearts),
            'C' => Some(Suit::Clubs),
            'D' => Some(Suit::Diamonds),
            _ => None,
        }
    }
}

impl Serialize for Suit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code().to_string())
    }
}

impl<'de> Deserialize<'de> for Suit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let c = s.chars().next().ok_or_else(|| serde::de::Error::custom("empty suit"))?;
        Suit::from_code(c).ok_or_else(|| serde::de::Error::custom(format!("unknown suit: {s}")))
    }
}

/// A single playing card: rank 1 (ace) through 13 (king), plus suit.
///
/// Serializes as a `[rank, suit]` pair, matching the wire shape used by
/// `RevealCard`'s `card` field (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.rank, self.suit).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (rank, suit) = <(u8, Suit)>::deserialize(deserializer)?;
        Ok(Card { rank, suit })
    }
}

/// A 52-card deck belonging to a single room, dealt without replacement.
///
/// Per the original source, the remaining cards are reshuffled on every
/// single deal rather than once up front; this is preserved here even
/// though it is wasted work, since §4.5 resolves ambiguity in favor of the
/// original's observed behavior.
#[derive(Debug, Clone)]
pub struct Deck {
    remaining: Vec<Card>,
}

impl Deck {
    /// Builds a fresh, unshuffled 52-card deck.
    pub fn new() -> Self {
        let mut remaining = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in 1..=13u8 {
                remaining.push(Card { rank, suit });
            }
        }
        Self { remaining }
    }

    /// Number of cards left to deal.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Shuffles the remaining cards and deals one from the tail.
    ///
    /// Returns `None` once the deck is exhausted.
    pub fn deal(&mut self, rng: &mut impl Rng) -> Option<Card> {
        self.remaining.shuffle(rng);
        self.remaining.pop()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}
