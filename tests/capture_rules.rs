use chrono::Utc;
use triad_rs::board::{Board, Position};
use triad_rs::cards::{Card, CardId, Element, Strengths};
use triad_rs::game::{Match, MatchId, MatchState, MoveError, PlayerId};

fn card(id: u32, top: u8, right: u8, bottom: u8, left: u8) -> Card {
    let strengths = Strengths::new(top, right, bottom, left).unwrap();
    Card::new(CardId(id), format!("T{id}"), strengths, Element::None, 1)
}

fn pos(x: u8, y: u8) -> Position {
    Position::new(x, y).unwrap()
}

/// `first` moves first.
fn fresh(first: &str, second: &str) -> MatchState {
    MatchState::new(
        Match::new(MatchId(1), first.into(), Some(second.into()), Utc::now()),
        Board::new(),
    )
}

#[test]
fn bottom_eight_captures_top_three_below() {
    let a = PlayerId::from("player-a");
    let b = PlayerId::from("player-b");
    let mut st = fresh("player-b", "player-a");

    st.apply_move(&card(1, 3, 2, 2, 2), &b, pos(1, 0), Utc::now()).unwrap();
    let out = st.apply_move(&card(2, 1, 1, 8, 1), &a, pos(1, 1), Utc::now()).unwrap();

    assert_eq!(out.captured.len(), 1);
    let taken = &out.captured[0];
    assert_eq!(taken.position, pos(1, 0));
    assert_eq!(taken.owner, a);
    assert_eq!(taken.placed_by, b);
    assert_eq!(st.record().score_of(&a), Some(6));
    assert_eq!(st.record().score_of(&b), Some(4));
}

#[test]
fn equal_faces_never_capture() {
    let mut st = fresh("bob", "ann");
    st.apply_move(&card(1, 5, 1, 1, 1), &"bob".into(), pos(1, 0), Utc::now()).unwrap();
    let out = st.apply_move(&card(2, 1, 1, 5, 1), &"ann".into(), pos(1, 1), Utc::now()).unwrap();
    assert!(out.captured.is_empty());
    assert_eq!((out.player1_score, out.player2_score), (5, 5));
}

#[test]
fn occupied_cell_wins_over_turn_and_capture_potential() {
    let mut st = fresh("bob", "ann");
    st.apply_move(&card(1, 1, 1, 1, 1), &"bob".into(), pos(1, 0), Utc::now()).unwrap();

    let strong = card(2, 10, 10, 10, 10);
    let by_waiting = st.apply_move(&strong, &"bob".into(), pos(1, 0), Utc::now());
    assert_eq!(by_waiting, Err(MoveError::CellOccupied(pos(1, 0))));
    let by_current = st.apply_move(&strong, &"ann".into(), pos(1, 0), Utc::now());
    assert_eq!(by_current, Err(MoveError::CellOccupied(pos(1, 0))));
}

#[test]
fn waiting_player_is_told_whose_turn_it_is() {
    let mut st = fresh("bob", "ann");
    let err = st.apply_move(&card(1, 1, 1, 1, 1), &"ann".into(), pos(2, 2), Utc::now());
    assert_eq!(
        err,
        Err(MoveError::NotYourTurn { expected: Some("bob".into()), got: "ann".into() })
    );
    assert!(st.board().is_empty());
}

#[test]
fn captured_card_does_not_attack_further() {
    let ann = PlayerId::from("ann");
    let bob = PlayerId::from("bob");
    let mut st = fresh("bob", "ann");

    st.apply_move(&card(1, 1, 9, 1, 1), &bob, pos(1, 0), Utc::now()).unwrap();
    st.apply_move(&card(2, 1, 1, 1, 1), &ann, pos(0, 2), Utc::now()).unwrap();
    st.apply_move(&card(3, 1, 1, 1, 1), &bob, pos(2, 0), Utc::now()).unwrap();
    let out = st.apply_move(&card(4, 1, 1, 9, 1), &ann, pos(1, 1), Utc::now()).unwrap();

    assert_eq!(out.captured.len(), 1);
    assert_eq!(st.board().get(pos(1, 0)).unwrap().placement.owner, ann);
    assert_eq!(st.board().get(pos(2, 0)).unwrap().placement.owner, bob);
}

#[test]
fn capture_keeps_placements_in_place() {
    let ann = PlayerId::from("ann");
    let mut st = fresh("bob", "ann");
    st.apply_move(&card(1, 1, 1, 1, 1), &"bob".into(), pos(0, 1), Utc::now()).unwrap();
    st.apply_move(&card(2, 1, 1, 1, 7), &ann, pos(1, 1), Utc::now()).unwrap();

    let board = st.board();
    assert_eq!(board.len(), 2);
    let cell = board.get(pos(0, 1)).unwrap();
    assert_eq!(cell.placement.card_id, CardId(1));
    assert_eq!(cell.placement.owner, ann);
    assert_eq!(cell.placement.placed_by, PlayerId::from("bob"));
}

#[test]
fn center_card_takes_all_four_neighbours_and_wins() {
    let ann = PlayerId::from("ann");
    let bob = PlayerId::from("bob");
    let mut st = fresh("ann", "bob");
    // Ann holds the corners, Bob the edge midpoints.
    let plan = [
        (&ann, pos(0, 0)),
        (&bob, pos(1, 0)),
        (&ann, pos(2, 0)),
        (&bob, pos(0, 1)),
        (&ann, pos(0, 2)),
        (&bob, pos(2, 1)),
        (&ann, pos(2, 2)),
        (&bob, pos(1, 2)),
    ];
    for (i, (who, at)) in plan.into_iter().enumerate() {
        st.apply_move(&card(10 + i as u32, 1, 1, 1, 1), who, at, Utc::now()).unwrap();
    }
    let out = st.apply_move(&card(99, 2, 2, 2, 2), &ann, pos(1, 1), Utc::now()).unwrap();

    assert_eq!(out.captured.len(), 4);
    assert!(out.completed);
    assert_eq!((out.player1_score, out.player2_score), (9, 1));
    assert_eq!(out.winner, Some(ann));
    assert_eq!(out.next_turn, None);
}
