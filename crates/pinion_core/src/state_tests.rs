use super::*;

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

fn legal_names(state: &GameState, id: &str) -> Vec<String> {
    let mut names: Vec<String> = state
        .piece(&pid(id))
        .unwrap()
        .legals
        .iter()
        .map(|&s| square_name(s))
        .collect();
    names.sort();
    names
}

#[test]
fn opening_position_has_the_expected_legal_moves() {
    let state = GameState::new();
    assert_eq!(legal_names(&state, "WKP"), vec!["e3", "e4"]);
    assert_eq!(legal_names(&state, "WKN"), vec!["f3", "h3"]);
    assert!(legal_names(&state, "WQ").is_empty());
    assert!(legal_names(&state, "WK").is_empty());
    assert!(legal_names(&state, "WQR").is_empty());
}

#[test]
fn developed_knights_attack_their_hand_computed_squares() {
    let mut state = GameState::new();
    state.process_move("WKNf3").unwrap();
    state.process_move("BQNc6").unwrap();

    // The f3 knight reaches {d2,d4,e1,e5,g1,g5,h2,h4} minus own-occupied
    assert_eq!(legal_names(&state, "WKN"), vec!["d4", "e5", "g1", "g5", "h4"]);
    // The c6 knight reaches {a5,a7,b4,b8,d4,d8,e5,e7} minus own-occupied
    assert_eq!(legal_names(&state, "BQN"), vec!["a5", "b4", "b8", "d4", "e5"]);
}

#[test]
fn occupancy_and_registry_stay_consistent_through_moves() {
    let mut state = GameState::new();
    state.process_move("WKPe4").unwrap();
    state.process_move("BQPd5").unwrap();
    state.process_move("WKPxd5").unwrap();

    assert_eq!(state.id_at(sq("d5")), Some(&pid("WKP")));
    assert_eq!(state.id_at(sq("e4")), None);
    assert_eq!(state.id_at(sq("e2")), None);
    assert!(state.piece(&pid("BQP")).is_err());
    assert_eq!(state.captures(), &[pid("BQP")]);
    assert_eq!(state.captures_of(Side::Black), vec![pid("BQP")]);
    assert_eq!(state.side_to_move(), Side::Black);
}

#[test]
fn a_file_pin_freezes_a_bishop_entirely() {
    // Rook e8 pins the e4 bishop against its king on e1; a bishop has
    // no move along a file, so its legal set collapses.
    let state = place(
        &[("WK", "e1"), ("WB", "e4"), ("BR", "e8"), ("BK", "a8")],
        Side::White,
    );
    let bishop = state.piece(&pid("WB")).unwrap();
    assert_eq!(bishop.kpin, Some(pid("BR")));
    assert!(bishop.legals.is_empty());
    assert!(!bishop.potentials.is_empty());
}

#[test]
fn a_diagonal_pin_restricts_a_bishop_to_the_pin_line() {
    // Queen h4 pins the f2 bishop along h4-g3-f2-e1. The bishop keeps
    // exactly the on-line squares, capture of the pinner included.
    let state = place(
        &[("WK", "e1"), ("WKB", "f2"), ("BQ", "h4"), ("BK", "a8")],
        Side::White,
    );
    let bishop = state.piece(&pid("WKB")).unwrap();
    assert_eq!(bishop.kpin, Some(pid("BQ")));
    assert_eq!(legal_names(&state, "WKB"), vec!["g3", "h4"]);

    // Unpinned, the same bishop has strictly more moves; the pinned set
    // is the intersection of the unpinned set with the pin line.
    let unpinned = place(&[("WK", "e1"), ("WKB", "f2"), ("BK", "a8")], Side::White);
    let free = legal_names(&unpinned, "WKB");
    assert!(free.len() > 2);
    for name in legal_names(&state, "WKB") {
        assert!(free.contains(&name), "{name} should survive unpinning");
    }
}

#[test]
fn en_passant_target_is_the_passed_over_square_and_clears() {
    let mut state = GameState::new();
    state.process_move("WKPe4").unwrap();
    assert_eq!(state.en_passant(), Some(sq("e3")));

    // Any move by a different piece clears it
    state.process_move("BKNf6").unwrap();
    assert_eq!(state.en_passant(), None);
}

#[test]
fn en_passant_capture_removes_the_bypassed_pawn() {
    let mut state = GameState::new();
    state.process_move("WKPe4").unwrap();
    state.process_move("BKNf6").unwrap();
    state.process_move("WKPe5").unwrap();
    state.process_move("BQPd5").unwrap();
    assert_eq!(state.en_passant(), Some(sq("d6")));

    // The e5 pawn may take the bypassed d5 pawn by moving to d6
    assert!(state.piece(&pid("WKP")).unwrap().legals.contains(&sq("d6")));
    state.process_move("WKPxd6ep").unwrap();
    assert_eq!(state.id_at(sq("d6")), Some(&pid("WKP")));
    assert_eq!(state.id_at(sq("d5")), None);
    assert!(state.piece(&pid("BQP")).is_err());
    assert_eq!(state.en_passant(), None);
}

#[test]
fn kingside_castling_moves_both_pieces_and_marks_them() {
    let mut state = GameState::new();
    for mv in ["WKPe4", "BKPe5", "WKBc4", "BKBc5", "WKNf3", "BKNf6"] {
        state.process_move(mv).unwrap();
    }
    assert!(state.piece(&pid("WK")).unwrap().legals.contains(&sq("g1")));

    state.process_move("O-O").unwrap();
    assert_eq!(state.id_at(sq("g1")), Some(&pid("WK")));
    assert_eq!(state.id_at(sq("f1")), Some(&pid("WKR")));
    assert!(state.piece(&pid("WK")).unwrap().moved);
    assert!(state.piece(&pid("WKR")).unwrap().moved);
    assert!(!state.castle_right(Side::White, CastleSide::KingSide));
    assert!(!state.castle_right(Side::White, CastleSide::QueenSide));
}

#[test]
fn castling_is_refused_through_an_attacked_square() {
    // Black rook on f8 covers the f-file; the white king may not cross f1.
    let state = place(
        &[("WK", "e1"), ("WKR", "h1"), ("BR", "f8"), ("BK", "a8")],
        Side::White,
    );
    let king = state.piece(&pid("WK")).unwrap();
    assert!(
        !king.legals.contains(&sq("g1")),
        "castling across an attacked square must be illegal"
    );
    assert!(state.self_check(sq("e1"), sq("g1")));
}

#[test]
fn fools_mate_is_recorded_with_suffix_and_result() {
    let mut state = GameState::new();
    for mv in ["WKBPf3", "BKPe5", "WKNPg4"] {
        state.process_move(mv).unwrap();
    }
    let recorded = state.process_move("BQh4").unwrap();
    assert_eq!(recorded, "BQh4#");
    assert!(state.in_check(Side::White));
    assert!(state.is_checkmate(Side::White));
    let moves = state.moves();
    assert_eq!(moves[moves.len() - 2], "BQh4#");
    assert_eq!(moves[moves.len() - 1], "0-1");
}

#[test]
fn check_that_can_be_parried_is_not_mate() {
    let mut state = GameState::new();
    state.process_move("WKPe4").unwrap();
    state.process_move("BKBPf5").unwrap();
    let recorded = state.process_move("WQh5").unwrap();
    assert_eq!(recorded, "WQh5+");
    assert!(state.in_check(Side::Black));
    assert!(!state.is_checkmate(Side::Black));
    // The g7 pawn can interpose on g6
    assert_eq!(legal_names(&state, "BKNP"), vec!["g6"]);
}

#[test]
fn double_check_with_a_trapped_king_is_always_mate() {
    // Queen a1 checks along the a-file, bishop f3 along the long
    // diagonal; rook b1 seals the b-file. Two simultaneous checkers
    // short-circuit to mate without consulting interception, even
    // though the h7 rook could have blocked either line on its own.
    let state = place(
        &[
            ("BK", "a8"),
            ("BR", "h7"),
            ("WQ", "a1"),
            ("WB", "f3"),
            ("WR", "b1"),
            ("WK", "e1"),
        ],
        Side::Black,
    );
    let king = state.piece(&pid("BK")).unwrap();
    assert_eq!(king.attacked_by.len(), 2);
    assert!(king.legals.is_empty());
    assert!(state.is_checkmate(Side::Black));
}

#[test]
fn a_single_checker_that_can_be_captured_is_not_mate() {
    // Queen h7, backed by the h1 rook, checks the cornered king; the
    // king cannot retake a defended queen, but the a7 rook can.
    let state = place(
        &[
            ("BK", "h8"),
            ("BR", "a7"),
            ("BQNP", "g6"),
            ("WQ", "h7"),
            ("WR", "h1"),
            ("WK", "a1"),
        ],
        Side::Black,
    );
    let king = state.piece(&pid("BK")).unwrap();
    assert_eq!(king.attacked_by, vec![pid("WQ")]);
    assert!(king.legals.is_empty());
    assert!(state.piece(&pid("BR")).unwrap().legals.contains(&sq("h7")));
    assert!(!state.is_checkmate(Side::Black));
}

#[test]
fn a_pinned_defender_cannot_refute_mate() {
    // The g7 rook is the only piece bearing on the mating queen, but it
    // is pinned along the long diagonal by the a1 bishop.
    let state = place(
        &[
            ("BK", "h8"),
            ("BR", "g7"),
            ("BN", "g8"),
            ("WQ", "h7"),
            ("WR", "h1"),
            ("WB", "a1"),
            ("WK", "a2"),
        ],
        Side::Black,
    );
    let rook = state.piece(&pid("BR")).unwrap();
    assert_eq!(rook.kpin, Some(pid("WB")));
    assert!(
        !rook.legals.contains(&sq("h7")),
        "a pinned rook may not leave the a1-h8 diagonal"
    );
    assert!(state.is_checkmate(Side::Black));
}

#[test]
fn self_check_catches_discovered_checks_independently() {
    // Knight e2 sits between its king and the e8 rook.
    let state = place(
        &[("WK", "e1"), ("WN", "e2"), ("BR", "e8"), ("BK", "a8")],
        Side::White,
    );
    assert!(state.self_check(sq("e2"), sq("c3")));
    let knight = state.piece(&pid("WN")).unwrap();
    assert_eq!(knight.kpin, Some(pid("BR")));
    assert!(knight.legals.is_empty());
}

#[test]
fn promotion_runs_in_two_phases_and_retires_the_pawn() {
    let mut state = place(
        &[("WQRP", "a7"), ("WK", "e1"), ("BK", "h5"), ("BQNP", "g5")],
        Side::White,
    );
    let recorded = state.process_move("WQRPa8=").unwrap();
    assert_eq!(recorded, "WQRPa8=");
    assert_eq!(state.promotion_pending(), Some(sq("a8")));
    // Destination committed, side to move unchanged until phase two
    assert_eq!(state.side_to_move(), Side::White);

    let promoted = state.next_promotion_id(Side::White, Role::Queen);
    assert_eq!(promoted, pid("W1Q"));
    state.process_move("WQRPa8=W1Q").unwrap();
    assert_eq!(state.promotion_pending(), None);
    assert_eq!(state.side_to_move(), Side::Black);
    assert_eq!(state.id_at(sq("a8")), Some(&pid("W1Q")));
    assert!(state.piece(&pid("WQRP")).is_err());
    // The retired pawn is not a capture
    assert!(state.captures().is_empty());
    // Both phases collapse into one move-list entry
    assert_eq!(state.moves(), ["WQRPa8=W1Q".to_string()]);
}

#[test]
fn position_hash_tracks_position_not_history() {
    let mut shuffled = GameState::new();
    let start = shuffled.position_hash();
    for mv in ["WKNf3", "BKNf6", "WKNg1", "BKNg8"] {
        shuffled.process_move(mv).unwrap();
    }
    assert_eq!(shuffled.position_hash(), start);

    let mut mid_shuffle = GameState::new();
    mid_shuffle.process_move("WKNf3").unwrap();
    mid_shuffle.process_move("BKNf6").unwrap();
    mid_shuffle.process_move("WKNg1").unwrap();
    assert_ne!(shuffled.position_hash(), mid_shuffle.position_hash());
}

#[test]
fn position_hash_sees_en_passant_and_castling_rights() {
    let mut state = GameState::new();
    state.process_move("WKPe4").unwrap();
    assert_eq!(state.en_passant(), Some(sq("e3")));

    // Same placement and side to move, en-passant window closed
    let mut lapsed = state.clone();
    lapsed.en_passant = None;
    lapsed.recompute_all();
    assert_ne!(state.position_hash(), lapsed.position_hash());

    // Shuffling a rook away and back forfeits one castling right
    let mut rights = GameState::new();
    for mv in ["WKRPh4", "BKPe5", "WKRh3", "BKPe4", "WKRh1", "BQNc6"] {
        rights.process_move(mv).unwrap();
    }
    assert!(!rights.castle_right(Side::White, CastleSide::KingSide));
    assert!(rights.castle_right(Side::White, CastleSide::QueenSide));
}

#[test]
fn relational_lists_cross_reference_each_other() {
    let mut state = GameState::new();
    state.process_move("WKPe4").unwrap();
    state.process_move("BQPd5").unwrap();

    let wkp = state.piece(&pid("WKP")).unwrap();
    let bqp = state.piece(&pid("BQP")).unwrap();
    assert!(wkp.attacking.contains(&pid("BQP")));
    assert!(wkp.attacked_by.contains(&pid("BQP")));
    assert!(bqp.attacking.contains(&pid("WKP")));
    assert!(bqp.attacked_by.contains(&pid("WKP")));
    // The advanced pawn is covered by its queen
    assert!(bqp.defended_by.contains(&pid("BQ")));
    assert!(state.piece(&pid("BQ")).unwrap().defending.contains(&pid("BQP")));
}

#[test]
fn missing_piece_lookups_fail_loudly() {
    let state = GameState::new();
    let ghost = pid("W9Q");
    match state.piece(&ghost) {
        Err(EngineError::MissingPiece(id)) => assert_eq!(id, "W9Q"),
        other => panic!("expected MissingPiece, got {other:?}"),
    }

    let mut state = GameState::new();
    assert!(state.process_move("W9Qe4").is_err());
    // Moving out of turn is a contract violation, not a state change
    assert!(state.process_move("BKPe5").is_err());
    assert!(state.moves().is_empty());
}
