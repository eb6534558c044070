use crate::cards::CardId;
use crate::game::{MatchId, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandError {
    #[error("duplicate card {0} in hand")]
    DuplicateCard(CardId),
    #[error("card {0} is not in hand or already used")]
    CardNotInHand(CardId),
}

/// One card dealt to one player for one match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandEntry {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub card_id: CardId,
    pub used: bool,
}

/// A player's hand for a match.
///
/// ```
/// use triad_rs::cards::CardId;
/// use triad_rs::game::MatchId;
/// use triad_rs::hand::Hand;
///
/// let hand = Hand::deal(MatchId(1), "ann".into(), &[CardId(1), CardId(2)]).unwrap();
/// assert!(hand.playable(CardId(2)).is_ok());
/// assert!(hand.playable(CardId(3)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hand {
    entries: Vec<HandEntry>,
}

impl Hand {
    /// Fresh, unused entries for `cards`. A card may appear only once.
    pub fn deal(match_id: MatchId, player: PlayerId, cards: &[CardId]) -> Result<Self, HandError> {
        let mut seen = HashSet::with_capacity(cards.len());
        let mut entries = Vec::with_capacity(cards.len());
        for &card_id in cards {
            if !seen.insert(card_id) {
                return Err(HandError::DuplicateCard(card_id));
            }
            entries.push(HandEntry { match_id, player_id: player.clone(), card_id, used: false });
        }
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<HandEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[HandEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<HandEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The unused entry for `card`, if the player may still play it.
    pub fn playable(&self, card: CardId) -> Result<&HandEntry, HandError> {
        self.entries
            .iter()
            .find(|e| e.card_id == card && !e.used)
            .ok_or(HandError::CardNotInHand(card))
    }

    pub fn unused(&self) -> impl Iterator<Item = &HandEntry> {
        self.entries.iter().filter(|e| !e.used)
    }

    pub fn used_count(&self) -> usize {
        self.entries.iter().filter(|e| e.used).count()
    }
}
