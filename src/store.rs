//! Persistence boundary.
//!
//! `MatchStore` is what the service needs from durable storage. `MemoryStore`
//! keeps everything behind one lock, which makes `commit_move` atomic and
//! enforces the same uniqueness rules a relational schema would:
//! one placement per (match, cell) and one hand entry per (match, player, card).

use crate::board::{Placement, Position};
use crate::cards::CardId;
use crate::game::{Match, MatchId, MatchStatus, PlayerId};
use crate::hand::{Hand, HandEntry};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("no placement at {position} in match {match_id}")]
    PlacementNotFound { match_id: MatchId, position: Position },
    #[error("no unused hand entry for card {card_id} of {player} in match {match_id}")]
    HandEntryNotFound { match_id: MatchId, player: PlayerId, card_id: CardId },
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Everything one successful move writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCommit {
    pub placement: Placement,
    pub captured: Vec<Placement>,
    pub record: Match,
}

pub trait MatchStore: Send + Sync {
    fn create_match(
        &self,
        player1: &PlayerId,
        player2: Option<&PlayerId>,
        at: DateTime<Utc>,
    ) -> Result<Match, StoreError>;
    fn load_match(&self, id: MatchId) -> Result<Option<Match>, StoreError>;
    fn save_match(&self, record: &Match) -> Result<(), StoreError>;
    /// A waiting or active match `player` takes part in.
    fn find_active_match_for_player(&self, player: &PlayerId) -> Result<Option<Match>, StoreError>;
    /// Waiting matches, oldest first.
    fn list_waiting_matches(&self) -> Result<Vec<Match>, StoreError>;

    /// Placements of a match in the order they were made.
    fn load_placements(&self, id: MatchId) -> Result<Vec<Placement>, StoreError>;
    fn save_placement(&self, placement: &Placement) -> Result<(), StoreError>;
    fn save_captured_ownership(&self, captured: &[Placement]) -> Result<(), StoreError>;

    fn create_hand(&self, hand: &Hand) -> Result<(), StoreError>;
    fn load_hand(&self, id: MatchId, player: &PlayerId) -> Result<Vec<HandEntry>, StoreError>;
    fn mark_hand_entry_used(
        &self,
        id: MatchId,
        player: &PlayerId,
        card_id: CardId,
    ) -> Result<(), StoreError>;

    /// Persist a move. Implementations backed by a real database should wrap
    /// this in a transaction; the default runs the steps one by one.
    fn commit_move(&self, commit: &MoveCommit) -> Result<(), StoreError> {
        self.save_placement(&commit.placement)?;
        if !commit.captured.is_empty() {
            self.save_captured_ownership(&commit.captured)?;
        }
        let p = &commit.placement;
        self.mark_hand_entry_used(p.match_id, &p.placed_by, p.card_id)?;
        self.save_match(&commit.record)
    }
}

#[derive(Debug, Default)]
struct Tables {
    last_id: u64,
    matches: BTreeMap<MatchId, Match>,
    placements: HashMap<MatchId, Vec<Placement>>,
    hands: HashMap<(MatchId, PlayerId), Vec<HandEntry>>,
}

impl Tables {
    fn ensure_match(&self, id: MatchId) -> Result<(), StoreError> {
        if self.matches.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MatchNotFound(id))
        }
    }

    fn check_placement(&self, placement: &Placement) -> Result<(), StoreError> {
        self.ensure_match(placement.match_id)?;
        let taken = self
            .placements
            .get(&placement.match_id)
            .is_some_and(|ps| ps.iter().any(|p| p.position == placement.position));
        if taken {
            return Err(StoreError::Conflict(format!(
                "match {} already has a card at {}",
                placement.match_id, placement.position
            )));
        }
        Ok(())
    }

    fn check_owners(&self, captured: &[Placement]) -> Result<(), StoreError> {
        for c in captured {
            let exists = self
                .placements
                .get(&c.match_id)
                .is_some_and(|ps| ps.iter().any(|p| p.position == c.position));
            if !exists {
                return Err(StoreError::PlacementNotFound {
                    match_id: c.match_id,
                    position: c.position,
                });
            }
        }
        Ok(())
    }

    fn unused_entry(
        &mut self,
        id: MatchId,
        player: &PlayerId,
        card_id: CardId,
    ) -> Result<&mut HandEntry, StoreError> {
        self.hands
            .get_mut(&(id, player.clone()))
            .and_then(|es| es.iter_mut().find(|e| e.card_id == card_id && !e.used))
            .ok_or_else(|| StoreError::HandEntryNotFound {
                match_id: id,
                player: player.clone(),
                card_id,
            })
    }

    fn apply_owners(&mut self, captured: &[Placement]) {
        for c in captured {
            if let Some(p) = self
                .placements
                .get_mut(&c.match_id)
                .and_then(|ps| ps.iter_mut().find(|p| p.position == c.position))
            {
                p.owner = c.owner.clone();
            }
        }
    }
}

/// Thread-safe in-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_count(&self) -> usize {
        self.tables.read().matches.len()
    }
}

impl MatchStore for MemoryStore {
    fn create_match(
        &self,
        player1: &PlayerId,
        player2: Option<&PlayerId>,
        at: DateTime<Utc>,
    ) -> Result<Match, StoreError> {
        let mut t = self.tables.write();
        t.last_id += 1;
        let id = MatchId(t.last_id);
        let record = Match::new(id, player1.clone(), player2.cloned(), at);
        t.matches.insert(id, record.clone());
        Ok(record)
    }

    fn load_match(&self, id: MatchId) -> Result<Option<Match>, StoreError> {
        Ok(self.tables.read().matches.get(&id).cloned())
    }

    fn save_match(&self, record: &Match) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let slot = t.matches.get_mut(&record.id()).ok_or(StoreError::MatchNotFound(record.id()))?;
        *slot = record.clone();
        Ok(())
    }

    fn find_active_match_for_player(&self, player: &PlayerId) -> Result<Option<Match>, StoreError> {
        let t = self.tables.read();
        Ok(t.matches
            .values()
            .find(|m| {
                matches!(m.status(), MatchStatus::Waiting | MatchStatus::Active)
                    && m.is_participant(player)
            })
            .cloned())
    }

    fn list_waiting_matches(&self) -> Result<Vec<Match>, StoreError> {
        let t = self.tables.read();
        let mut waiting: Vec<Match> = t
            .matches
            .values()
            .filter(|m| m.status() == MatchStatus::Waiting && m.player2().is_none())
            .cloned()
            .collect();
        waiting.sort_by_key(|m| (m.created_at(), m.id()));
        Ok(waiting)
    }

    fn load_placements(&self, id: MatchId) -> Result<Vec<Placement>, StoreError> {
        let t = self.tables.read();
        t.ensure_match(id)?;
        Ok(t.placements.get(&id).cloned().unwrap_or_default())
    }

    fn save_placement(&self, placement: &Placement) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        t.check_placement(placement)?;
        t.placements.entry(placement.match_id).or_default().push(placement.clone());
        Ok(())
    }

    fn save_captured_ownership(&self, captured: &[Placement]) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        t.check_owners(captured)?;
        t.apply_owners(captured);
        Ok(())
    }

    fn create_hand(&self, hand: &Hand) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        for entry in hand.entries() {
            t.ensure_match(entry.match_id)?;
            let duplicate = t
                .hands
                .get(&(entry.match_id, entry.player_id.clone()))
                .is_some_and(|es| es.iter().any(|e| e.card_id == entry.card_id));
            if duplicate {
                return Err(StoreError::Conflict(format!(
                    "card {} already dealt to {} in match {}",
                    entry.card_id, entry.player_id, entry.match_id
                )));
            }
        }
        for entry in hand.entries() {
            t.hands
                .entry((entry.match_id, entry.player_id.clone()))
                .or_default()
                .push(entry.clone());
        }
        Ok(())
    }

    fn load_hand(&self, id: MatchId, player: &PlayerId) -> Result<Vec<HandEntry>, StoreError> {
        let t = self.tables.read();
        t.ensure_match(id)?;
        Ok(t.hands.get(&(id, player.clone())).cloned().unwrap_or_default())
    }

    fn mark_hand_entry_used(
        &self,
        id: MatchId,
        player: &PlayerId,
        card_id: CardId,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        t.unused_entry(id, player, card_id)?.used = true;
        Ok(())
    }

    fn commit_move(&self, commit: &MoveCommit) -> Result<(), StoreError> {
        let p = &commit.placement;
        let mut t = self.tables.write();
        // Check every constraint before the first write.
        t.check_placement(p)?;
        t.check_owners(&commit.captured)?;
        t.unused_entry(p.match_id, &p.placed_by, p.card_id)?;
        if commit.record.id() != p.match_id {
            return Err(StoreError::Conflict(format!(
                "placement for match {} committed with match {}",
                p.match_id,
                commit.record.id()
            )));
        }

        t.placements.entry(p.match_id).or_default().push(p.clone());
        t.apply_owners(&commit.captured);
        t.unused_entry(p.match_id, &p.placed_by, p.card_id)?.used = true;
        t.matches.insert(commit.record.id(), commit.record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(id: MatchId, x: u8, y: u8, who: &str, card: u32) -> Placement {
        Placement {
            match_id: id,
            card_id: CardId(card),
            placed_by: who.into(),
            owner: who.into(),
            position: Position::new(x, y).unwrap(),
            placed_at: Utc::now(),
        }
    }

    #[test]
    fn ids_are_sequential() {
        let store = MemoryStore::new();
        let a = store.create_match(&"ann".into(), None, Utc::now()).unwrap();
        let b = store.create_match(&"bob".into(), Some(&"AI".into()), Utc::now()).unwrap();
        assert_eq!((a.id(), b.id()), (MatchId(1), MatchId(2)));
        assert_eq!(b.status(), MatchStatus::Active);
    }

    #[test]
    fn finds_waiting_and_active_matches_only() {
        let store = MemoryStore::new();
        let mut m = store.create_match(&"ann".into(), Some(&"bob".into()), Utc::now()).unwrap();
        assert!(store.find_active_match_for_player(&"bob".into()).unwrap().is_some());
        m.abandon(Utc::now()).unwrap();
        store.save_match(&m).unwrap();
        assert!(store.find_active_match_for_player(&"bob".into()).unwrap().is_none());
    }

    #[test]
    fn waiting_list_excludes_started_matches() {
        let store = MemoryStore::new();
        let first = store.create_match(&"ann".into(), None, Utc::now()).unwrap();
        store.create_match(&"bob".into(), Some(&"eve".into()), Utc::now()).unwrap();
        let third = store.create_match(&"cat".into(), None, Utc::now()).unwrap();
        let ids: Vec<_> = store.list_waiting_matches().unwrap().iter().map(Match::id).collect();
        assert_eq!(ids, vec![first.id(), third.id()]);
    }

    #[test]
    fn cell_uniqueness_is_enforced() {
        let store = MemoryStore::new();
        let m = store.create_match(&"ann".into(), Some(&"bob".into()), Utc::now()).unwrap();
        store.save_placement(&placement(m.id(), 1, 1, "ann", 1)).unwrap();
        let err = store.save_placement(&placement(m.id(), 1, 1, "bob", 2)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.load_placements(m.id()).unwrap().len(), 1);
    }

    #[test]
    fn hand_entries_are_unique_per_player() {
        let store = MemoryStore::new();
        let m = store.create_match(&"ann".into(), Some(&"bob".into()), Utc::now()).unwrap();
        let hand = Hand::deal(m.id(), "ann".into(), &[CardId(1), CardId(2)]).unwrap();
        store.create_hand(&hand).unwrap();
        assert!(matches!(store.create_hand(&hand), Err(StoreError::Conflict(_))));
        // The same card may be dealt to the opponent.
        let other = Hand::deal(m.id(), "bob".into(), &[CardId(1)]).unwrap();
        store.create_hand(&other).unwrap();
        assert_eq!(store.load_hand(m.id(), &"ann".into()).unwrap().len(), 2);
    }

    #[test]
    fn failed_commit_writes_nothing() {
        let store = MemoryStore::new();
        let m = store.create_match(&"ann".into(), Some(&"bob".into()), Utc::now()).unwrap();
        // No hand was dealt, so the hand mark fails after the placement check passes.
        let commit = MoveCommit {
            placement: placement(m.id(), 0, 0, "ann", 1),
            captured: vec![],
            record: m.clone(),
        };
        assert!(matches!(store.commit_move(&commit), Err(StoreError::HandEntryNotFound { .. })));
        assert!(store.load_placements(m.id()).unwrap().is_empty());
    }

    #[test]
    fn unknown_match_is_reported() {
        let store = MemoryStore::new();
        assert_eq!(store.load_placements(MatchId(9)), Err(StoreError::MatchNotFound(MatchId(9))));
        assert_eq!(store.load_match(MatchId(9)), Ok(None));
    }
}
