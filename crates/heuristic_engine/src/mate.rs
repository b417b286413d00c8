//! Deliver-mate: hunts for a mate in one. Discovered checks from
//! shadow blockers first, then captures of pinned pieces that uncover
//! an unanswerable check, then direct attacks into the enemy king's
//! box, pruned by revealed-line and abandoned-defense safety checks.

use tracing::debug;

use pinion_core::geometry::{
    direction_between, file_of, rank_of, ray_from, square_at, step, Direction, Square, ORDINALS,
    ROYALS,
};
use pinion_core::piece::{Piece, PieceId, Role, Side};
use pinion_core::state::GameState;
use pinion_core::GeneratedMove;

use crate::see::{square_value_reoccupy, ScoreCache};

pub fn deliver_mate(state: &GameState, cache: &mut ScoreCache) -> Option<GeneratedMove> {
    debug!("entered deliver_mate");
    let me = state.side_to_move();
    let opp = me.other();
    let opp_king_id = PieceId::king(opp);
    let opp_king = state.piece(&opp_king_id).ok()?;

    // Discovered checks our shadow blockers could uncover
    for pid in state.ids_of(me) {
        let piece = match state.piece(&pid) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if piece.kshadow.is_some() {
            if let Some(mv) = discovered_check_mate(state, piece, opp_king) {
                return Some(mv);
            }
        }
    }

    // Captures of pinned enemy pieces that arrive with check
    for pid in state.ids_of(opp) {
        let piece = match state.piece(&pid) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if piece.kpin.is_some() {
            if let Some(mv) = pin_check_mate(state, cache, piece, opp_king) {
                return Some(mv);
            }
        }
    }

    // Direct attacks on the king's access squares
    let k_sq = opp_king.square?;
    let k_legals = opp_king.legals.clone();
    let k_attacking = opp_king.attacking.clone();
    for (pid, to) in assemble_candidates(state, opp_king) {
        let score = square_value_reoccupy(state, cache, &pid, to);
        if score < 0 {
            continue;
        }
        if state.id_at(to).is_some() && score <= 0 {
            // an even trade is no mate: the checker just gets taken
            continue;
        }
        let controlled: Vec<Square> = direction_between(to, k_sq)
            .map(|d| ray_from(to, d))
            .unwrap_or_default();
        let interposers = state.intercept_alignment(&opp_king_id, to);
        if !interposers.is_empty() {
            continue;
        }
        let revealed = revealed_squares(state, &pid);
        let escapes: Vec<Square> = k_legals
            .iter()
            .copied()
            .filter(|sq| !controlled.contains(sq) && !revealed.contains(sq))
            .collect();
        if !escapes.is_empty() {
            continue;
        }
        if abandons_sole_defense(state, &pid, to, &k_attacking) {
            continue;
        }
        return Some(GeneratedMove {
            pid,
            to,
            promotion: None,
        });
    }

    None
}

/// Mate by moving a shadow blocker off its line: the covered piece
/// checks, the blocker itself may seal remaining flight squares.
fn discovered_check_mate(
    state: &GameState,
    blocker: &Piece,
    opp_king: &Piece,
) -> Option<GeneratedMove> {
    debug!("entered discovered_check_mate");
    let checker_id = blocker.kshadow.clone()?;
    let checker_sq = state.square_of(&checker_id)?;
    let k_sq = opp_king.square?;
    let drctn = direction_between(checker_sq, k_sq)?;
    let controlled = ray_from(checker_sq, drctn);
    let interposers = state.intercept_alignment(&opp_king.id, checker_sq);

    // Only departures from the shadow line uncover the check
    let departures: Vec<Square> = blocker
        .legals
        .iter()
        .copied()
        .filter(|&to| blocker.is_shadowed(to, state))
        .collect();
    if departures.is_empty() {
        return None;
    }

    let escapes: Vec<Square> = opp_king
        .legals
        .iter()
        .copied()
        .filter(|sq| !controlled.contains(sq))
        .collect();

    if escapes.is_empty() && interposers.is_empty() {
        // nowhere to run and nothing to interpose: any departure mates
        return Some(GeneratedMove {
            pid: blocker.id.clone(),
            to: departures[0],
            promotion: None,
        });
    }

    // Can the blocker itself cover every remaining flight square?
    let mut covering: Vec<Square> = Vec::new();
    for &escape in &escapes {
        let posts = move_towards(escape, &departures, blocker.directions());
        if posts.is_empty() {
            return None;
        }
        covering.extend(posts);
    }
    if interposers.is_empty() && !covering.is_empty() {
        return Some(GeneratedMove {
            pid: blocker.id.clone(),
            to: covering[0],
            promotion: None,
        });
    }
    None
}

/// Mate by capturing a pinned piece (or, for a pinned pawn, taking it
/// en passant): the capture lands on the pin line with check, and the
/// king has nowhere left along it.
fn pin_check_mate(
    state: &GameState,
    cache: &mut ScoreCache,
    pinned: &Piece,
    opp_king: &Piece,
) -> Option<GeneratedMove> {
    debug!("entered pin_check_mate");
    let k_sq = opp_king.square?;
    let pinned_sq = pinned.square?;
    let pinner = pinned.kpin.clone()?;

    for attacker_id in pinned.attacked_by.clone() {
        let (mv_to, checking_sq, checking_piece, recapturers) = if attacker_id.is_pawn()
            && pinned.role == Role::Pawn
            && en_passant_victim(state, pinned.side.other()) == Some(pinned_sq)
        {
            // En-passant: the victim vanishes and its own pinner checks
            let landing = state.en_passant()?;
            let pinner_piece = state.piece(&pinner).ok()?;
            let pinner_sq = pinner_piece.square?;
            (landing, pinner_sq, pinner_piece, pinner_piece.attacked_by.clone())
        } else {
            // Plain capture: the capturer checks from the pin line
            let attacker = state.piece(&attacker_id).ok()?;
            (pinned_sq, pinned_sq, attacker, pinned.defended_by.clone())
        };

        let playable = state
            .piece(&attacker_id)
            .map(|p| p.legals.contains(&mv_to))
            .unwrap_or(false);
        if !playable {
            continue;
        }
        let score = square_value_reoccupy(state, cache, &attacker_id, mv_to);
        if score < 0 {
            continue;
        }
        let pin_drctn = match direction_between(checking_sq, k_sq) {
            Some(d) => d,
            None => continue,
        };
        if !checking_piece.directions().contains(&pin_drctn) {
            continue;
        }
        let controlled = ray_from(checking_sq, pin_drctn);
        let interposers = state.intercept_alignment(&opp_king.id, mv_to);
        let has_escape = opp_king.legals.iter().any(|sq| !controlled.contains(sq));
        if !has_escape && interposers.is_empty() && recapturers.is_empty() {
            return Some(GeneratedMove {
                pid: attacker_id,
                to: mv_to,
                promotion: None,
            });
        }
    }
    None
}

/// Square of the pawn currently capturable en passant by `capturing`.
fn en_passant_victim(state: &GameState, capturing: Side) -> Option<Square> {
    let target = state.en_passant()?;
    let delta = match capturing {
        Side::White => -1,
        Side::Black => 1,
    };
    square_at(file_of(target), rank_of(target) + delta)
}

/// My non-king pieces that can legally land on one of the king's
/// access squares bearing toward it, plus every off-line move of a
/// shadow blocker (any departure is itself a check).
fn assemble_candidates(state: &GameState, opp_king: &Piece) -> Vec<(PieceId, Square)> {
    let me = state.side_to_move();
    let k_sq = match opp_king.square {
        Some(sq) => sq,
        None => return Vec::new(),
    };
    let mut candidates: Vec<(PieceId, Square)> = Vec::new();
    let mut note = |entry: (PieceId, Square), out: &mut Vec<(PieceId, Square)>| {
        if !out.contains(&entry) {
            out.push(entry);
        }
    };
    for &access in &opp_king.accessors {
        let drctn = direction_between(access, k_sq);
        for pid in state.ids_of(me) {
            if pid.is_king() {
                continue;
            }
            let piece = match state.piece(&pid) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if piece.kshadow.is_some() {
                for &to in &piece.legals {
                    if piece.is_shadowed(to, state) {
                        note((pid.clone(), to), &mut candidates);
                    }
                }
                continue;
            }
            let d = match drctn {
                Some(d) => d,
                None => continue,
            };
            if !piece.legals.contains(&access) || !piece.directions().contains(&d) {
                continue;
            }
            if pid.is_pawn() && !(ORDINALS.contains(&d) && step(d, access) == Some(k_sq)) {
                continue;
            }
            note((pid.clone(), access), &mut candidates);
        }
    }
    candidates
}

/// Landing squares among `options` from which a piece with the given
/// capability would attack `target` at one step.
fn move_towards(
    target: Square,
    options: &[Square],
    directions: &[Direction],
) -> Vec<Square> {
    let mut posts = Vec::new();
    for &from in options {
        if let Some(d) = direction_between(from, target) {
            if directions.contains(&d) && step(d, from) == Some(target) {
                posts.push(from);
            }
        }
    }
    posts
}

/// Squares our own sliders gain control of once `pid` vacates its
/// square: flight squares that only look free.
fn revealed_squares(state: &GameState, pid: &PieceId) -> Vec<Square> {
    let from = match state.square_of(pid) {
        Some(sq) => sq,
        None => return Vec::new(),
    };
    let side = pid.side();
    let mut revealed = Vec::new();
    for drctn in ROYALS {
        if let Some(behind_sq) = state.first_occupant_along(from, drctn) {
            let behind = match state.piece_at(behind_sq) {
                Some(p) => p,
                None => continue,
            };
            if behind.side != side
                || !matches!(behind.role, Role::Queen | Role::Rook | Role::Bishop)
            {
                continue;
            }
            if let Some(through) = direction_between(behind_sq, from) {
                if behind.directions().contains(&through) {
                    revealed.extend(ray_from(from, through));
                }
            }
        }
    }
    revealed
}

/// True when some piece the enemy king attacks is defended only by the
/// mover, and the mover no longer covers it from `to`: the king would
/// simply take it and slip the net.
fn abandons_sole_defense(
    state: &GameState,
    mover: &PieceId,
    to: Square,
    king_attacking: &[PieceId],
) -> bool {
    let role = mover.role();
    let side = mover.side();
    for target in king_attacking {
        let target_piece = match state.piece(target) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let sole_defender =
            target_piece.defended_by.len() == 1 && target_piece.defended_by[0] == *mover;
        if !sole_defender {
            continue;
        }
        let target_sq = match target_piece.square {
            Some(sq) => sq,
            None => continue,
        };
        if !still_defends(state, role, side, to, target_sq) {
            return true;
        }
    }
    false
}

fn still_defends(state: &GameState, role: Role, side: Side, from: Square, target: Square) -> bool {
    let d = match direction_between(from, target) {
        Some(d) => d,
        None => return false,
    };
    if !role.directions(side).contains(&d) {
        return false;
    }
    match role {
        Role::Pawn => ORDINALS.contains(&d) && step(d, from) == Some(target),
        Role::Knight => true,
        Role::King => step(d, from) == Some(target),
        _ => state.first_occupant_along(from, d) == Some(target),
    }
}
