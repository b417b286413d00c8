use super::*;
use crate::geometry::parse_square;
use crate::state::GameState;

fn sq(name: &str) -> Square {
    parse_square(name).unwrap()
}

fn pid(text: &str) -> PieceId {
    PieceId::new(text).unwrap()
}

#[test]
fn piece_ids_validate_and_round_trip() {
    for good in ["WK", "BQ", "WQR", "BKNP", "W1Q", "B12R", "WQRP"] {
        let id = PieceId::new(good).unwrap();
        assert_eq!(id.to_string(), good);
    }
    for bad in ["", "W", "XK", "Wk", "WKX", "Wa1K"] {
        assert!(PieceId::new(bad).is_err(), "{bad:?} should be invalid");
    }
}

#[test]
fn piece_ids_decode_side_and_role() {
    assert_eq!(pid("WQR").side(), Side::White);
    assert_eq!(pid("WQR").role(), Role::Rook);
    assert_eq!(pid("BKNP").side(), Side::Black);
    assert_eq!(pid("BKNP").role(), Role::Pawn);
    assert!(pid("WK").is_king());
    assert!(!pid("WKB").is_king());
    assert!(pid("BQP").is_pawn());
    assert_eq!(PieceId::king(Side::Black), pid("BK"));
    assert_eq!(PieceId::promoted(Side::White, 2, Role::Knight), pid("W2N"));
}

#[test]
fn capabilities_carry_direction_sets_and_step_limits() {
    assert_eq!(Role::Queen.directions(Side::White).len(), 8);
    assert_eq!(Role::Rook.directions(Side::Black), &CARDINALS);
    assert_eq!(Role::Bishop.directions(Side::White), &ORDINALS);
    assert_eq!(Role::Knight.directions(Side::Black), &HALF_WINDS);
    assert_eq!(
        Role::Pawn.directions(Side::White),
        &[Direction::NE, Direction::N, Direction::NW]
    );
    assert_eq!(
        Role::Pawn.directions(Side::Black),
        &[Direction::SE, Direction::S, Direction::SW]
    );
    assert!(Role::King.single_step());
    assert!(Role::Knight.single_step());
    assert!(Role::Pawn.single_step());
    assert!(!Role::Queen.single_step());
}

#[test]
fn alignment_respects_role_distance_rules() {
    let rook = Piece::new(pid("WQR"), sq("a1"));
    assert!(rook.aligned_with(sq("a8")));
    assert!(rook.aligned_with(sq("h1")));
    assert!(!rook.aligned_with(sq("b2")));

    let king = Piece::new(pid("WK"), sq("e1"));
    assert!(king.aligned_with(sq("e2")));
    assert!(king.aligned_with(sq("d2")));
    assert!(!king.aligned_with(sq("e3")), "kings reach one step only");

    let knight = Piece::new(pid("WKN"), sq("g1"));
    assert!(knight.aligned_with(sq("f3")));
    assert!(!knight.aligned_with(sq("e5")));

    // Pawns align on capture squares only, never straight ahead
    let pawn = Piece::new(pid("WKP"), sq("e2"));
    assert!(pawn.aligned_with(sq("d3")));
    assert!(pawn.aligned_with(sq("f3")));
    assert!(!pawn.aligned_with(sq("e3")));
    assert!(!pawn.aligned_with(sq("g4")));
}

#[test]
fn moved_flags_depend_on_the_starting_square() {
    assert!(!Piece::new(pid("WK"), sq("e1")).moved);
    assert!(Piece::new(pid("WK"), sq("e2")).moved);
    assert!(!Piece::new(pid("BKR"), sq("h8")).moved);
    assert!(Piece::new(pid("BKR"), sq("h4")).moved);
    assert!(!Piece::new(pid("WQNP"), sq("b2")).moved);
    assert!(Piece::new(pid("WQNP"), sq("b4")).moved);
    // A promoted rook never regains castling eligibility
    assert!(Piece::new(pid("W1R"), sq("h1")).moved);
}

#[test]
fn pin_and_shadow_predicates_test_line_membership() {
    let placements = [
        (pid("WK"), sq("e1")),
        (pid("WQ"), sq("e4")),
        (pid("BR"), sq("e8")),
        (pid("BK"), sq("h8")),
    ];
    let state = GameState::from_positions(&placements, Side::White).unwrap();
    let queen = state.piece(&pid("WQ")).unwrap();
    assert_eq!(queen.kpin, Some(pid("BR")));
    // On the pin line: advancing and capturing the pinner are allowed
    assert!(!queen.is_pinned(sq("e6"), &state));
    assert!(!queen.is_pinned(sq("e8"), &state));
    // Leaving the line is not
    assert!(queen.is_pinned(sq("a4"), &state));
    assert!(queen.is_pinned(sq("g6"), &state));

    // The f3 knight blocks its own queen's line to the black king
    let placements = [
        (pid("WK"), sq("a1")),
        (pid("WQ"), sq("h1")),
        (pid("WKN"), sq("h4")),
        (pid("BK"), sq("h8")),
    ];
    let state = GameState::from_positions(&placements, Side::White).unwrap();
    let knight = state.piece(&pid("WKN")).unwrap();
    assert_eq!(knight.kshadow, Some(pid("WQ")));
    // Any knight move leaves the h-file and uncovers the check
    assert!(knight.is_shadowed(sq("f5"), &state));
    assert!(knight.is_shadowed(sq("g6"), &state));
}
