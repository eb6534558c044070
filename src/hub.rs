//! Push notifications to the subscribers of a match.

use crate::board::Position;
use crate::cards::CardId;
use crate::game::{Match, MatchId, MatchStatus, MoveOutcome, PlayerId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// A cell that changed hands during a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedCell {
    pub position: Position,
    pub new_owner: PlayerId,
}

/// State deltas pushed after a successful operation. Rejections are never
/// broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[non_exhaustive]
pub enum MatchEvent {
    MatchJoined {
        match_id: MatchId,
        player1: PlayerId,
        player2: PlayerId,
        status: MatchStatus,
        current_turn: Option<PlayerId>,
        player1_score: u8,
        player2_score: u8,
    },
    CardPlayed {
        match_id: MatchId,
        player: PlayerId,
        card: CardId,
        position: Position,
        captured: Vec<CapturedCell>,
        player1_score: u8,
        player2_score: u8,
        next_turn: Option<PlayerId>,
        completed: bool,
        winner: Option<PlayerId>,
    },
    GameCompleted {
        match_id: MatchId,
        winner: Option<PlayerId>,
        player1_score: u8,
        player2_score: u8,
        completed_at: Option<DateTime<Utc>>,
    },
}

impl MatchEvent {
    pub fn match_id(&self) -> MatchId {
        match self {
            MatchEvent::MatchJoined { match_id, .. }
            | MatchEvent::CardPlayed { match_id, .. }
            | MatchEvent::GameCompleted { match_id, .. } => *match_id,
        }
    }

    /// `None` while the match still lacks a second player.
    pub fn joined(record: &Match) -> Option<Self> {
        Some(MatchEvent::MatchJoined {
            match_id: record.id(),
            player1: record.player1().clone(),
            player2: record.player2()?.clone(),
            status: record.status(),
            current_turn: record.current_turn().cloned(),
            player1_score: record.player1_score(),
            player2_score: record.player2_score(),
        })
    }

    pub fn card_played(outcome: &MoveOutcome) -> Self {
        let p = &outcome.placement;
        MatchEvent::CardPlayed {
            match_id: p.match_id,
            player: p.placed_by.clone(),
            card: p.card_id,
            position: p.position,
            captured: outcome
                .captured
                .iter()
                .map(|c| CapturedCell { position: c.position, new_owner: c.owner.clone() })
                .collect(),
            player1_score: outcome.player1_score,
            player2_score: outcome.player2_score,
            next_turn: outcome.next_turn.clone(),
            completed: outcome.completed,
            winner: outcome.winner.clone(),
        }
    }

    pub fn game_completed(record: &Match) -> Self {
        MatchEvent::GameCompleted {
            match_id: record.id(),
            winner: record.winner().cloned(),
            player1_score: record.player1_score(),
            player2_score: record.player2_score(),
            completed_at: record.completed_at(),
        }
    }
}

/// Subscriber channels grouped by match.
#[derive(Debug, Default)]
pub struct MatchHub {
    groups: DashMap<MatchId, Vec<UnboundedSender<MatchEvent>>>,
}

impl MatchHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, match_id: MatchId) -> UnboundedReceiver<MatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.groups.entry(match_id).or_default().push(tx);
        rx
    }

    /// Send `event` to every live subscriber of `match_id`, dropping closed
    /// channels. Returns how many subscribers received it.
    pub fn broadcast(&self, match_id: MatchId, event: &MatchEvent) -> usize {
        let Some(mut group) = self.groups.get_mut(&match_id) else {
            return 0;
        };
        group.retain(|tx| tx.send(event.clone()).is_ok());
        trace!(%match_id, delivered = group.len(), "broadcast");
        group.len()
    }

    /// A receiver whose stream has already ended.
    pub fn closed() -> UnboundedReceiver<MatchEvent> {
        let (_, rx) = mpsc::unbounded_channel();
        rx
    }

    /// Number of matches with a subscriber group.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn subscriber_count(&self, match_id: MatchId) -> usize {
        self.groups.get(&match_id).map_or(0, |g| g.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// Drop every channel of `match_id`; receivers see the stream end.
    pub fn close(&self, match_id: MatchId) {
        self.groups.remove(&match_id);
    }
}
