use crate::cards::{CardId, Side, Strengths};
use crate::game::{MatchId, PlayerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cells per row and per column.
pub const BOARD_SIZE: u8 = 3;
/// Total number of cells; a match ends when all are filled.
pub const CELL_COUNT: usize = (BOARD_SIZE as usize) * (BOARD_SIZE as usize);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BoardError {
    #[error("position ({x}, {y}) is outside the 3x3 board")]
    OutOfBounds { x: u8, y: u8 },
    #[error("cell {0} already holds a card")]
    DuplicateCell(Position),
}

/// A cell on the 3x3 grid. `x` grows to the right and `y` grows upward.
///
/// ```
/// use triad_rs::board::{Direction, Position};
///
/// let center = Position::new(1, 1).unwrap();
/// assert_eq!(center.neighbor(Direction::Up), Some(Position::new(1, 2).unwrap()));
/// assert!(Position::new(3, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    x: u8,
    y: u8,
}

#[derive(Deserialize)]
struct RawPosition {
    x: u8,
    y: u8,
}

impl TryFrom<RawPosition> for Position {
    type Error = BoardError;
    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Position::new(raw.x, raw.y)
    }
}

impl Position {
    pub fn new(x: u8, y: u8) -> Result<Self, BoardError> {
        if x >= BOARD_SIZE || y >= BOARD_SIZE {
            return Err(BoardError::OutOfBounds { x, y });
        }
        Ok(Self { x, y })
    }

    pub const fn x(self) -> u8 {
        self.x
    }

    pub const fn y(self) -> u8 {
        self.y
    }

    pub(crate) const fn index(self) -> usize {
        (self.y as usize) * (BOARD_SIZE as usize) + self.x as usize
    }

    /// The adjacent cell in `dir`, or `None` at the board edge.
    pub fn neighbor(self, dir: Direction) -> Option<Position> {
        let (dx, dy) = dir.offset();
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Position::new(x, y).ok()
    }

    /// All nine cells, row by row from `y = 0`.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE).flat_map(|y| (0..BOARD_SIZE).map(move |x| Position { x, y }))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The four orthogonal directions a placed card attacks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] =
        [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    pub const fn offset(self) -> (i8, i8) {
        match self {
            Direction::Up => (0, 1),
            Direction::Right => (1, 0),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
        }
    }

    /// Face of the placed card that points at the neighbour.
    pub const fn attacking_side(self) -> Side {
        match self {
            Direction::Up => Side::Top,
            Direction::Right => Side::Right,
            Direction::Down => Side::Bottom,
            Direction::Left => Side::Left,
        }
    }

    /// Face of the neighbour that points back at the placed card.
    pub const fn defending_side(self) -> Side {
        self.attacking_side().opposite()
    }
}

/// A card occupying one cell of a match board.
///
/// `placed_by` never changes; `owner` follows captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub match_id: MatchId,
    pub card_id: CardId,
    pub placed_by: PlayerId,
    pub owner: PlayerId,
    pub position: Position,
    pub placed_at: DateTime<Utc>,
}

/// A placement together with the strengths of its card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardCell {
    pub placement: Placement,
    pub strengths: Strengths,
}

impl BoardCell {
    pub fn new(placement: Placement, strengths: Strengths) -> Self {
        Self { placement, strengths }
    }
}

/// In-memory snapshot of one match board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Option<BoardCell>; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self { cells: std::array::from_fn(|_| None) }
    }

    /// Build a board from stored placements, rejecting two cards on one cell.
    pub fn from_cells<I>(cells: I) -> Result<Self, BoardError>
    where
        I: IntoIterator<Item = BoardCell>,
    {
        let mut board = Self::new();
        for cell in cells {
            board.place(cell)?;
        }
        Ok(board)
    }

    pub fn get(&self, pos: Position) -> Option<&BoardCell> {
        self.cells[pos.index()].as_ref()
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.cells[pos.index()].is_some()
    }

    pub fn len(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.cells.iter().flatten().map(|c| &c.placement)
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        Position::all().filter(move |&p| !self.is_occupied(p))
    }

    /// Cells currently owned by `player`.
    pub fn owned_by(&self, player: &PlayerId) -> usize {
        self.placements().filter(|p| &p.owner == player).count()
    }

    /// Cards `player` has put down, regardless of who owns them now.
    pub fn placed_by(&self, player: &PlayerId) -> usize {
        self.placements().filter(|p| &p.placed_by == player).count()
    }

    pub(crate) fn place(&mut self, cell: BoardCell) -> Result<(), BoardError> {
        let pos = cell.placement.position;
        let slot = &mut self.cells[pos.index()];
        if slot.is_some() {
            return Err(BoardError::DuplicateCell(pos));
        }
        *slot = Some(cell);
        Ok(())
    }

    pub(crate) fn set_owner(&mut self, pos: Position, owner: &PlayerId) -> Option<&Placement> {
        let cell = self.cells[pos.index()].as_mut()?;
        cell.placement.owner = owner.clone();
        Some(&cell.placement)
    }
}
