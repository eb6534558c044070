use crate::board::{Board, BoardCell, Placement, Position, CELL_COUNT};
use crate::capture::resolve_captures;
use crate::cards::Card;
use crate::validate::validate_move;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points each player holds before the first card is played.
pub const STARTING_SCORE: u8 = 5;
/// Sum of both scores at every point of a match.
pub const TOTAL_POINTS: u8 = 2 * STARTING_SCORE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque player identifier. "AI" is just another id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum MatchStatus {
    Waiting,
    Active,
    Completed,
    Abandoned,
}

impl MatchStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MatchStatus::Waiting => "waiting",
            MatchStatus::Active => "active",
            MatchStatus::Completed => "completed",
            MatchStatus::Abandoned => "abandoned",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Abandoned)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MoveError {
    #[error("cell {0} is already occupied")]
    CellOccupied(Position),
    #[error("not your turn: expected {expected:?}, got {got}")]
    NotYourTurn { expected: Option<PlayerId>, got: PlayerId },
    #[error("moves are not accepted while the match is {0}")]
    InvalidMatchState(MatchStatus),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SetupError {
    #[error("match is {0}, not waiting for a player")]
    NotJoinable(MatchStatus),
    #[error("cannot join your own match")]
    OwnMatch,
    #[error("match already has two players")]
    MatchFull,
    #[error("match is already {0}")]
    AlreadyTerminal(MatchStatus),
}

/// Persistent record of one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Match {
    pub(crate) id: MatchId,
    pub(crate) player1: PlayerId,
    pub(crate) player2: Option<PlayerId>,
    pub(crate) current_turn: Option<PlayerId>,
    pub(crate) status: MatchStatus,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) winner: Option<PlayerId>,
    pub(crate) player1_score: u8,
    pub(crate) player2_score: u8,
}

impl Match {
    /// A new match. Without a second player it waits; otherwise it starts
    /// immediately. Player 1 always moves first.
    pub fn new(
        id: MatchId,
        player1: PlayerId,
        player2: Option<PlayerId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let status = if player2.is_some() { MatchStatus::Active } else { MatchStatus::Waiting };
        Self {
            id,
            current_turn: Some(player1.clone()),
            player1,
            player2,
            status,
            created_at,
            completed_at: None,
            winner: None,
            player1_score: STARTING_SCORE,
            player2_score: STARTING_SCORE,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn player1(&self) -> &PlayerId {
        &self.player1
    }

    pub fn player2(&self) -> Option<&PlayerId> {
        self.player2.as_ref()
    }

    /// Returns the player expected to move; `None` once the match is over
    pub fn current_turn(&self) -> Option<&PlayerId> {
        self.current_turn.as_ref()
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Winner of a completed match; `None` while running or on a draw
    pub fn winner(&self) -> Option<&PlayerId> {
        self.winner.as_ref()
    }

    pub fn player1_score(&self) -> u8 {
        self.player1_score
    }

    pub fn player2_score(&self) -> u8 {
        self.player2_score
    }

    pub fn is_participant(&self, player: &PlayerId) -> bool {
        &self.player1 == player || self.player2.as_ref() == Some(player)
    }

    /// The opponent of `player`, if both seats are filled and `player` holds one.
    pub fn other_player(&self, player: &PlayerId) -> Option<&PlayerId> {
        let p2 = self.player2.as_ref()?;
        if &self.player1 == player {
            Some(p2)
        } else if p2 == player {
            Some(&self.player1)
        } else {
            None
        }
    }

    pub fn score_of(&self, player: &PlayerId) -> Option<u8> {
        if &self.player1 == player {
            Some(self.player1_score)
        } else if self.player2.as_ref() == Some(player) {
            Some(self.player2_score)
        } else {
            None
        }
    }

    /// Seat the second player and start the match.
    pub fn join(&mut self, player: PlayerId) -> Result<(), SetupError> {
        if self.status != MatchStatus::Waiting {
            return Err(SetupError::NotJoinable(self.status));
        }
        if self.player1 == player {
            return Err(SetupError::OwnMatch);
        }
        if self.player2.is_some() {
            return Err(SetupError::MatchFull);
        }
        self.player2 = Some(player);
        self.status = MatchStatus::Active;
        Ok(())
    }

    /// Out-of-band termination (disconnect, admin action).
    pub fn abandon(&mut self, at: DateTime<Utc>) -> Result<(), SetupError> {
        if self.status.is_terminal() {
            return Err(SetupError::AlreadyTerminal(self.status));
        }
        self.status = MatchStatus::Abandoned;
        self.current_turn = None;
        self.completed_at = Some(at);
        Ok(())
    }
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct MoveOutcome {
    pub placement: Placement,
    /// Captured placements with their new owner already set
    pub captured: Vec<Placement>,
    pub player1_score: u8,
    pub player2_score: u8,
    pub completed: bool,
    pub winner: Option<PlayerId>,
    pub next_turn: Option<PlayerId>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Caller-owned snapshot of a match and its board for the duration of one move.
#[derive(Debug, Clone)]
pub struct MatchState {
    record: Match,
    board: Board,
}

impl MatchState {
    pub fn new(record: Match, board: Board) -> Self {
        Self { record, board }
    }

    pub fn record(&self) -> &Match {
        &self.record
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_parts(self) -> (Match, Board) {
        (self.record, self.board)
    }

    /// Play `card` for `player` at `position`.
    ///
    /// On error nothing in the snapshot changes.
    pub fn apply_move(
        &mut self,
        card: &Card,
        player: &PlayerId,
        position: Position,
        at: DateTime<Utc>,
    ) -> Result<MoveOutcome, MoveError> {
        if self.record.status != MatchStatus::Active {
            return Err(MoveError::InvalidMatchState(self.record.status));
        }
        validate_move(&self.record, &self.board, player, position)?;
        let next = self
            .record
            .other_player(player)
            .cloned()
            .ok_or(MoveError::InvalidMatchState(self.record.status))?;

        let placement = Placement {
            match_id: self.record.id,
            card_id: card.id,
            placed_by: player.clone(),
            owner: player.clone(),
            position,
            placed_at: at,
        };
        self.board
            .place(BoardCell::new(placement.clone(), card.strengths))
            .map_err(|_| MoveError::CellOccupied(position))?;

        let captures = resolve_captures(&self.board, card.strengths, position, player);
        let captured: Vec<Placement> = captures
            .iter()
            .filter_map(|c| self.board.set_owner(c.position, player).cloned())
            .collect();

        self.record.player1_score = score_for(&self.board, &self.record.player1);
        self.record.player2_score = match &self.record.player2 {
            Some(p2) => score_for(&self.board, p2),
            None => STARTING_SCORE,
        };

        if self.board.len() >= CELL_COUNT {
            self.finish(at);
        } else {
            self.record.current_turn = Some(next);
        }

        Ok(MoveOutcome {
            placement,
            captured,
            player1_score: self.record.player1_score,
            player2_score: self.record.player2_score,
            completed: self.record.status == MatchStatus::Completed,
            winner: self.record.winner.clone(),
            next_turn: self.record.current_turn.clone(),
            completed_at: self.record.completed_at,
        })
    }

    fn finish(&mut self, at: DateTime<Utc>) {
        let r = &mut self.record;
        r.status = MatchStatus::Completed;
        r.completed_at = Some(at);
        r.current_turn = None;
        r.winner = if r.player1_score > r.player2_score {
            Some(r.player1.clone())
        } else if r.player2_score > r.player1_score {
            r.player2.clone()
        } else {
            None
        };
    }
}

/// Score derived from the board alone: start value, plus cards held, minus cards spent.
pub fn score_for(board: &Board, player: &PlayerId) -> u8 {
    let owned = u8::try_from(board.owned_by(player)).unwrap_or(u8::MAX);
    let placed = u8::try_from(board.placed_by(player)).unwrap_or(u8::MAX);
    STARTING_SCORE.saturating_add(owned).saturating_sub(placed)
}
