//! Adjacency capture rules.
//!
//! A freshly placed card fights each orthogonal neighbour owned by somebody
//! else. The attacker's face pointing at the neighbour is compared with the
//! neighbour's face pointing back; a strictly greater attack captures. Ties
//! never capture and captured cards do not go on to attack their own
//! neighbours.

use crate::board::{Board, Direction, Position};
use crate::cards::Strengths;
use crate::game::PlayerId;
use serde::{Deserialize, Serialize};

/// A single capture decision; applying it is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub position: Position,
    pub direction: Direction,
    pub attack: u8,
    pub defense: u8,
    pub previous_owner: PlayerId,
}

/// Compute which neighbours of `position` a card with `attacker` strengths,
/// placed by `player`, captures on `board`.
///
/// The board is only read. Results are in `Direction::ALL` order.
///
/// ```
/// use chrono::Utc;
/// use triad_rs::board::{Board, BoardCell, Placement, Position};
/// use triad_rs::capture::resolve_captures;
/// use triad_rs::cards::{CardId, Strengths};
/// use triad_rs::game::{MatchId, PlayerId};
///
/// let bob = PlayerId::from("bob");
/// let below = Position::new(1, 0).unwrap();
/// let board = Board::from_cells([BoardCell::new(
///     Placement {
///         match_id: MatchId(1),
///         card_id: CardId(2),
///         placed_by: bob.clone(),
///         owner: bob,
///         position: below,
///         placed_at: Utc::now(),
///     },
///     Strengths::new(3, 1, 1, 1).unwrap(),
/// )])
/// .unwrap();
///
/// let attacker = Strengths::new(1, 1, 8, 1).unwrap();
/// let center = Position::new(1, 1).unwrap();
/// let caps = resolve_captures(&board, attacker, center, &PlayerId::from("ann"));
/// assert_eq!(caps.len(), 1);
/// assert_eq!(caps[0].position, below);
/// ```
pub fn resolve_captures(
    board: &Board,
    attacker: Strengths,
    position: Position,
    player: &PlayerId,
) -> Vec<Capture> {
    Direction::ALL
        .iter()
        .filter_map(|&direction| {
            let target = position.neighbor(direction)?;
            let cell = board.get(target)?;
            if &cell.placement.owner == player {
                return None;
            }
            let attack = attacker.get(direction.attacking_side());
            let defense = cell.strengths.get(direction.defending_side());
            (attack > defense).then(|| Capture {
                position: target,
                direction,
                attack,
                defense,
                previous_owner: cell.placement.owner.clone(),
            })
        })
        .collect()
}
