use super::*;
use pinion_core::geometry::parse_square;

fn sq(name: &str) -> Square {
    parse_square(name).unwrap()
}

fn pid(text: &str) -> PieceId {
    PieceId::new(text).unwrap()
}

fn place(placements: &[(&str, &str)], first_turn: Side) -> GameState {
    let placements: Vec<(PieceId, Square)> = placements
        .iter()
        .map(|(id, at)| (pid(id), sq(at)))
        .collect();
    GameState::from_positions(&placements, first_turn).unwrap()
}

fn see(state: &GameState, mover: &str, to: &str) -> i32 {
    let mut cache = ScoreCache::new();
    square_value_reoccupy(state, &mut cache, &pid(mover), sq(to))
}

#[test]
fn winning_a_loose_piece_scores_its_worth() {
    let state = place(
        &[("WR", "a1"), ("BN", "a5"), ("WK", "h1"), ("BK", "h8")],
        Side::White,
    );
    assert_eq!(see(&state, "WR", "a5"), 6);
}

#[test]
fn capturing_a_defended_piece_counts_the_recapture() {
    // Rook takes knight, pawn takes rook: 6 - 10
    let state = place(
        &[
            ("WR", "a1"),
            ("BN", "a5"),
            ("BQNP", "b6"),
            ("WK", "h1"),
            ("BK", "h8"),
        ],
        Side::White,
    );
    assert_eq!(see(&state, "WR", "a5"), -4);
}

#[test]
fn occupying_an_uncontested_square_is_neutral() {
    let state = place(
        &[("WR", "a1"), ("WK", "h1"), ("BK", "h8")],
        Side::White,
    );
    assert_eq!(see(&state, "WR", "a4"), 0);
}

#[test]
fn a_pinned_mover_is_refused_outright() {
    // The e4 rook is pinned along the e-file and may not swing out
    let state = place(
        &[
            ("WK", "e1"),
            ("WR", "e4"),
            ("BQ", "e8"),
            ("BN", "c4"),
            ("BK", "a8"),
        ],
        Side::White,
    );
    assert_eq!(see(&state, "WR", "c4"), PINNED_MOVE_SCORE);
    // Capturing up the pin line is still a real exchange
    assert_ne!(see(&state, "WR", "e8"), PINNED_MOVE_SCORE);
}

#[test]
fn a_king_refuses_a_defended_square() {
    let state = place(
        &[
            ("WK", "b4"),
            ("BQNP", "b5"),
            ("BR", "b8"),
            ("BK", "h8"),
        ],
        Side::White,
    );
    assert_eq!(see(&state, "WK", "b5"), -Role::King.base_worth());
}

#[test]
fn exchange_scores_are_mirror_symmetric() {
    // White rook takes a knight defended by a pawn...
    let white_view = place(
        &[
            ("WR", "d1"),
            ("BN", "d5"),
            ("BKP", "e6"),
            ("WK", "h1"),
            ("BK", "h8"),
        ],
        Side::White,
    );
    // ...and the color-and-rank mirrored board for black
    let black_view = place(
        &[
            ("BR", "d8"),
            ("WN", "d4"),
            ("WKP", "e3"),
            ("BK", "h8"),
            ("WK", "h1"),
        ],
        Side::Black,
    );
    assert_eq!(see(&white_view, "WR", "d5"), see(&black_view, "BR", "d4"));
}

#[test]
fn cached_scores_are_reused_within_one_pass() {
    let state = place(
        &[("WR", "a1"), ("BN", "a5"), ("WK", "h1"), ("BK", "h8")],
        Side::White,
    );
    let mut cache = ScoreCache::new();
    let first = square_value_reoccupy(&state, &mut cache, &pid("WR"), sq("a5"));
    let second = square_value_reoccupy(&state, &mut cache, &pid("WR"), sq("a5"));
    assert_eq!(first, second);
    assert_eq!(first, 6);
}

#[test]
fn promotion_choice_prefers_the_queen_on_a_safe_square() {
    let state = place(
        &[("WQRP", "a7"), ("WK", "h1"), ("BK", "h8")],
        Side::White,
    );
    let choice = choose_promotion(&state, &pid("WQRP"), sq("a8"));
    assert_eq!(choice, Some(pid("W1Q")));
}

#[test]
fn promotion_choice_limits_the_damage_on_a_guarded_square() {
    // The h8 rook guards a8: whichever piece appears will be taken, so
    // the knight loses the least material.
    let state = place(
        &[("WQRP", "a7"), ("BR", "h8"), ("WK", "h1"), ("BK", "h7")],
        Side::White,
    );
    let choice = choose_promotion(&state, &pid("WQRP"), sq("a8"));
    assert_eq!(choice, Some(pid("W1N")));
}

#[test]
fn no_promotion_away_from_the_back_rank() {
    let state = place(
        &[("WQRP", "a6"), ("WK", "h1"), ("BK", "h8")],
        Side::White,
    );
    assert_eq!(choose_promotion(&state, &pid("WQRP"), sq("a7")), None);
    assert_eq!(choose_promotion(&state, &pid("WK"), sq("h2")), None);
}
