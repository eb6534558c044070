use crate::board::{Board, Position};
use crate::game::{Match, MoveError, PlayerId};

/// Board and turn legality of a move, checked in that order.
///
/// Card possession is not checked here; hands are the caller's data.
/// Coordinates are already bounded by [`Position`].
pub fn validate_move(
    record: &Match,
    board: &Board,
    player: &PlayerId,
    position: Position,
) -> Result<(), MoveError> {
    if board.is_occupied(position) {
        return Err(MoveError::CellOccupied(position));
    }
    if record.current_turn() != Some(player) {
        return Err(MoveError::NotYourTurn {
            expected: record.current_turn().cloned(),
            got: player.clone(),
        });
    }
    Ok(())
}
