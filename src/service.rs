//! Match orchestration: setup, moves and queries on top of a store, a card
//! catalog, the per-match coordinator and the notification hub.
//!
//! Every mutation of an existing match runs inside that match's exclusive
//! section. Lookups, validation, capture resolution, persistence and the
//! broadcast all happen before the section is released, so subscribers see
//! events in move order and a rejected move leaves no trace.

use crate::board::{Board, BoardCell, BoardError, Position};
use crate::cards::{Card, CardCatalog, CardId};
use crate::config::EngineConfig;
use crate::coordinator::{LockError, MatchLocks};
use crate::deck::{self, DealError, HAND_SIZE};
use crate::game::{
    Match, MatchId, MatchState, MatchStatus, MoveError, MoveOutcome, PlayerId, SetupError,
};
use crate::hand::{Hand, HandError};
use crate::hub::{MatchEvent, MatchHub};
use crate::store::{MatchStore, MoveCommit, StoreError};
use chrono::Utc;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayError {
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("card {0} not found")]
    CardNotFound(CardId),
    #[error("card {0} is not in your hand")]
    CardNotInHand(CardId),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SetupServiceError {
    #[error("{player} already has match {match_id} in progress")]
    AlreadyInMatch { player: PlayerId, match_id: MatchId },
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Deal(#[from] DealError),
    #[error(transparent)]
    Hand(#[from] HandError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryError {
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("card {0} not found")]
    CardNotFound(CardId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A move as it arrives from a transport. Coordinates are unchecked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRequest {
    pub match_id: MatchId,
    pub player: PlayerId,
    pub card: CardId,
    pub x: u8,
    pub y: u8,
}

/// A successful move and the match record it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub outcome: MoveOutcome,
    pub record: Match,
}

/// A created or joined match with the caller's freshly dealt hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSetup {
    pub record: Match,
    pub hand: Vec<Card>,
}

/// Read model of one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchView {
    pub record: Match,
    pub placements: Vec<crate::board::Placement>,
}

pub struct MatchService<S, C> {
    store: S,
    catalog: C,
    locks: MatchLocks,
    hub: MatchHub,
    rng: Mutex<ChaCha8Rng>,
    // Serializes create/join so the one-match-per-player check cannot race.
    setup: Mutex<()>,
}

impl<S: MatchStore, C: CardCatalog> MatchService<S, C> {
    pub fn new(store: S, catalog: C, config: &EngineConfig) -> Self {
        let seed = config.deal_seed.unwrap_or_else(|| rand::rng().random());
        Self {
            store,
            catalog,
            locks: MatchLocks::new(config.lock_timeout()),
            hub: MatchHub::new(),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            setup: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn hub(&self) -> &MatchHub {
        &self.hub
    }

    pub fn locks(&self) -> &MatchLocks {
        &self.locks
    }

    /// Follow the events of `match_id`. Unknown and finished matches yield a
    /// receiver that is already closed.
    pub fn subscribe(&self, match_id: MatchId) -> UnboundedReceiver<MatchEvent> {
        let live = self.locks.with_match(match_id, || {
            let open = matches!(
                self.store.load_match(match_id),
                Ok(Some(m)) if !m.status().is_terminal()
            );
            open.then(|| self.hub.subscribe(match_id))
        });
        match live {
            Ok(Some(rx)) => rx,
            Ok(None) => {
                self.locks.forget(match_id);
                MatchHub::closed()
            }
            // Somebody holds the section, so the match exists.
            Err(_) => self.hub.subscribe(match_id),
        }
    }

    /// Open a match for `player1`. With an opponent the match starts right
    /// away and both hands are dealt; otherwise it waits for a joiner.
    #[tracing::instrument(skip_all, fields(player1 = %player1))]
    pub fn create_match(
        &self,
        player1: &PlayerId,
        opponent: Option<&PlayerId>,
    ) -> Result<MatchSetup, SetupServiceError> {
        let _setup = self.setup.lock();
        self.ensure_free(player1)?;

        let hand1 = self.draw()?;
        let hand2 = opponent.map(|_| self.draw()).transpose()?;

        let record = self.store.create_match(player1, opponent, Utc::now())?;
        self.store.create_hand(&Hand::deal(record.id(), player1.clone(), &ids(&hand1))?)?;
        if let (Some(p2), Some(cards)) = (opponent, &hand2) {
            self.store.create_hand(&Hand::deal(record.id(), p2.clone(), &ids(cards))?)?;
        }
        info!(match_id = %record.id(), status = %record.status(), "match created");
        Ok(MatchSetup { record, hand: hand1 })
    }

    /// Take the open seat of a waiting match.
    #[tracing::instrument(skip_all, fields(%match_id, player = %player))]
    pub fn join_match(
        &self,
        match_id: MatchId,
        player: &PlayerId,
    ) -> Result<MatchSetup, SetupServiceError> {
        let result = self.locks.with_match(match_id, || {
            let mut record = self
                .store
                .load_match(match_id)?
                .ok_or(SetupServiceError::MatchNotFound(match_id))?;
            record.join(player.clone())?;
            // Lock order: match section first, then setup.
            let _setup = self.setup.lock();
            self.ensure_free(player)?;

            let hand = self.draw()?;
            self.store.create_hand(&Hand::deal(match_id, player.clone(), &ids(&hand))?)?;
            self.store.save_match(&record)?;
            info!(%match_id, "match joined");
            if let Some(event) = MatchEvent::joined(&record) {
                self.hub.broadcast(match_id, &event);
            }
            Ok::<_, SetupServiceError>(MatchSetup { record, hand })
        })?;
        if let Err(SetupServiceError::MatchNotFound(_)) = &result {
            self.locks.forget(match_id);
        }
        result
    }

    /// Validate and apply one move.
    #[tracing::instrument(
        skip_all,
        fields(match_id = %req.match_id, player = %req.player, card = %req.card)
    )]
    pub fn play_card(&self, req: &PlayRequest) -> Result<MoveReport, PlayError> {
        let position = Position::new(req.x, req.y)?;
        let result = self.locks.with_match(req.match_id, || self.play_locked(req, position))?;
        let settled = match &result {
            Ok(report) => report.outcome.completed,
            Err(e) => {
                debug!(error = %e, "move rejected");
                matches!(
                    e,
                    PlayError::MatchNotFound(_)
                        | PlayError::Move(MoveError::InvalidMatchState(
                            MatchStatus::Completed | MatchStatus::Abandoned
                        ))
                )
            }
        };
        // No further move can succeed, so drop the lock entry.
        if settled {
            self.locks.forget(req.match_id);
        }
        result
    }

    fn play_locked(&self, req: &PlayRequest, position: Position) -> Result<MoveReport, PlayError> {
        let record = self
            .store
            .load_match(req.match_id)?
            .ok_or(PlayError::MatchNotFound(req.match_id))?;
        if record.status() != MatchStatus::Active {
            return Err(MoveError::InvalidMatchState(record.status()).into());
        }
        let card = self.catalog.card_by_id(req.card).ok_or(PlayError::CardNotFound(req.card))?;
        let hand = Hand::from_entries(self.store.load_hand(req.match_id, &req.player)?);
        hand.playable(req.card).map_err(|_| PlayError::CardNotInHand(req.card))?;

        let board = self.load_board(req.match_id)?;
        let mut state = MatchState::new(record, board);
        let outcome = state.apply_move(card, &req.player, position, Utc::now())?;
        let (record, _) = state.into_parts();

        self.store.commit_move(&MoveCommit {
            placement: outcome.placement.clone(),
            captured: outcome.captured.clone(),
            record: record.clone(),
        })?;
        info!(
            %position,
            captured = outcome.captured.len(),
            p1 = outcome.player1_score,
            p2 = outcome.player2_score,
            "card played"
        );

        self.hub.broadcast(req.match_id, &MatchEvent::card_played(&outcome));
        if outcome.completed {
            info!(winner = ?record.winner(), "match completed");
            self.hub.broadcast(req.match_id, &MatchEvent::game_completed(&record));
            self.hub.close(req.match_id);
        }
        Ok(MoveReport { outcome, record })
    }

    /// The match record with its placements in play order.
    pub fn match_status(&self, match_id: MatchId) -> Result<MatchView, QueryError> {
        let record =
            self.store.load_match(match_id)?.ok_or(QueryError::MatchNotFound(match_id))?;
        let placements = self.store.load_placements(match_id)?;
        Ok(MatchView { record, placements })
    }

    /// Cards `player` may still play in `match_id`.
    pub fn hand(&self, match_id: MatchId, player: &PlayerId) -> Result<Vec<Card>, QueryError> {
        if self.store.load_match(match_id)?.is_none() {
            return Err(QueryError::MatchNotFound(match_id));
        }
        let hand = Hand::from_entries(self.store.load_hand(match_id, player)?);
        hand.unused()
            .map(|e| {
                self.catalog
                    .card_by_id(e.card_id)
                    .cloned()
                    .ok_or(QueryError::CardNotFound(e.card_id))
            })
            .collect()
    }

    /// Matches waiting for a second player, oldest first.
    pub fn waiting_matches(&self) -> Result<Vec<Match>, QueryError> {
        Ok(self.store.list_waiting_matches()?)
    }

    /// End a waiting or active match without a winner.
    #[tracing::instrument(skip(self))]
    pub fn abandon_match(&self, match_id: MatchId) -> Result<Match, SetupServiceError> {
        let result = self.locks.with_match(match_id, || {
            let mut record = self
                .store
                .load_match(match_id)?
                .ok_or(SetupServiceError::MatchNotFound(match_id))?;
            record.abandon(Utc::now())?;
            self.store.save_match(&record)?;
            self.hub.close(match_id);
            Ok::<_, SetupServiceError>(record)
        })?;
        let settled = match &result {
            Ok(_) => {
                warn!(%match_id, "match abandoned");
                true
            }
            Err(e) => matches!(
                e,
                SetupServiceError::MatchNotFound(_)
                    | SetupServiceError::Setup(SetupError::AlreadyTerminal(_))
            ),
        };
        if settled {
            self.locks.forget(match_id);
        }
        result
    }

    fn ensure_free(&self, player: &PlayerId) -> Result<(), SetupServiceError> {
        match self.store.find_active_match_for_player(player)? {
            Some(m) => {
                Err(SetupServiceError::AlreadyInMatch { player: player.clone(), match_id: m.id() })
            }
            None => Ok(()),
        }
    }

    fn draw(&self) -> Result<Vec<Card>, DealError> {
        deck::deal(self.catalog.all_cards(), HAND_SIZE, &mut *self.rng.lock())
    }

    fn load_board(&self, match_id: MatchId) -> Result<Board, PlayError> {
        let cells = self
            .store
            .load_placements(match_id)?
            .into_iter()
            .map(|p| {
                let card = self
                    .catalog
                    .card_by_id(p.card_id)
                    .ok_or(PlayError::CardNotFound(p.card_id))?;
                Ok(BoardCell::new(p, card.strengths))
            })
            .collect::<Result<Vec<_>, PlayError>>()?;
        Ok(Board::from_cells(cells)?)
    }
}

fn ids(cards: &[Card]) -> Vec<CardId> {
    cards.iter().map(|c| c.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Catalog;
    use crate::store::MemoryStore;

    fn service() -> MatchService<MemoryStore, Catalog> {
        let config = EngineConfig::default().with_deal_seed(1);
        MatchService::new(MemoryStore::new(), Catalog::starter(), &config)
    }

    #[test]
    fn create_with_opponent_deals_both_hands() {
        let svc = service();
        let setup = svc.create_match(&"ann".into(), Some(&"AI".into())).unwrap();
        assert_eq!(setup.record.status(), MatchStatus::Active);
        assert_eq!(setup.hand.len(), HAND_SIZE);
        assert_eq!(svc.hand(setup.record.id(), &"AI".into()).unwrap().len(), HAND_SIZE);
    }

    #[test]
    fn second_open_match_is_refused() {
        let svc = service();
        let first = svc.create_match(&"ann".into(), None).unwrap();
        let err = svc.create_match(&"ann".into(), None).unwrap_err();
        assert_eq!(
            err,
            SetupServiceError::AlreadyInMatch { player: "ann".into(), match_id: first.record.id() }
        );
    }

    #[test]
    fn out_of_bounds_is_rejected_before_lookup() {
        let svc = service();
        let req = PlayRequest {
            match_id: MatchId(77),
            player: "ann".into(),
            card: CardId(1),
            x: 3,
            y: 0,
        };
        assert_eq!(
            svc.play_card(&req),
            Err(PlayError::Board(BoardError::OutOfBounds { x: 3, y: 0 }))
        );
    }

    #[test]
    fn unknown_match_and_card() {
        let svc = service();
        let req = PlayRequest {
            match_id: MatchId(77),
            player: "ann".into(),
            card: CardId(1),
            x: 0,
            y: 0,
        };
        assert_eq!(svc.play_card(&req), Err(PlayError::MatchNotFound(MatchId(77))));

        let m = svc.create_match(&"ann".into(), Some(&"bob".into())).unwrap().record;
        let req = PlayRequest { match_id: m.id(), card: CardId(999), ..req };
        assert_eq!(svc.play_card(&req), Err(PlayError::CardNotFound(CardId(999))));
    }

    #[test]
    fn abandon_frees_the_player() {
        let svc = service();
        let m = svc.create_match(&"ann".into(), None).unwrap().record;
        let done = svc.abandon_match(m.id()).unwrap();
        assert_eq!(done.status(), MatchStatus::Abandoned);
        assert!(svc.create_match(&"ann".into(), None).is_ok());
        assert!(matches!(
            svc.abandon_match(m.id()),
            Err(SetupServiceError::Setup(SetupError::AlreadyTerminal(MatchStatus::Abandoned)))
        ));
    }
}
