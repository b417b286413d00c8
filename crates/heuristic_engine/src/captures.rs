//! Consider-captures: the better of defending the most valuable of our
//! attacked pieces and taking the opponent's best capturable piece,
//! accepted only when the exchange comes out non-negative.

use tracing::debug;

use pinion_core::geometry::{direction_between, file_of, rank_of, square_at, step, Square, ORDINALS};
use pinion_core::piece::{PieceId, Side};
use pinion_core::state::GameState;
use pinion_core::GeneratedMove;

use crate::see::{choose_promotion, rank_moves, square_value_reoccupy, ScoreCache, ScoredMove};

pub fn consider_captures(state: &GameState, cache: &mut ScoreCache) -> Option<GeneratedMove> {
    debug!("entered consider_captures");
    let escape = escape_capture(state, cache);
    let attempt = try_capture(state, cache);
    let best = match (escape, attempt) {
        (Some(a), Some(b)) => Some(if a.score > b.score { a } else { b }),
        (a, b) => a.or(b),
    };
    best.filter(|mv| mv.score >= 0).map(|mv| GeneratedMove {
        pid: mv.pid,
        to: mv.to,
        promotion: mv.promotion,
    })
}

/// The en-passant landing square for a pawn capturing the pawn on
/// `victim_sq`, when that capture is currently available.
fn en_passant_landing(state: &GameState, capturing: Side, victim_sq: Square) -> Option<Square> {
    let target = state.en_passant()?;
    let delta = match capturing {
        Side::White => 1,
        Side::Black => -1,
    };
    if square_at(file_of(victim_sq), rank_of(victim_sq) + delta) == Some(target) {
        Some(target)
    } else {
        None
    }
}

/// Best capture of an opponent piece, scored by exchange.
fn try_capture(state: &GameState, cache: &mut ScoreCache) -> Option<ScoredMove> {
    debug!("entered try_capture");
    let me = state.side_to_move();
    let mut scored: Vec<ScoredMove> = Vec::new();

    for opid in state.ids_of(me.other()) {
        let opiece = match state.piece(&opid) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let osq = match opiece.square {
            Some(sq) => sq,
            None => continue,
        };
        for apid in opiece.attacked_by.clone() {
            let apiece = match state.piece(&apid) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if apiece.is_pinned(osq, state) {
                continue;
            }
            let to = if opid.is_pawn() && apid.is_pawn() {
                en_passant_landing(state, me, osq).unwrap_or(osq)
            } else {
                osq
            };
            if !apiece.legals.contains(&to) {
                continue;
            }
            let score = square_value_reoccupy(state, cache, &apid, to);
            scored.push(ScoredMove {
                promotion: choose_promotion(state, &apid, to),
                pid: apid,
                to,
                score,
            });
        }
    }

    rank_moves(&mut scored);
    scored.into_iter().next()
}

/// Find the gravest standing threat against our pieces, then mitigate
/// it; the saved piece's value rides on top of the defensive score.
fn escape_capture(state: &GameState, cache: &mut ScoreCache) -> Option<ScoredMove> {
    debug!("entered escape_capture");
    let me = state.side_to_move();
    let mut threats: Vec<ScoredMove> = Vec::new();

    for mpid in state.ids_of(me) {
        let mpiece = match state.piece(&mpid) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let msq = match mpiece.square {
            Some(sq) => sq,
            None => continue,
        };
        for apid in mpiece.attacked_by.clone() {
            let apiece = match state.piece(&apid) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if apiece.is_pinned(msq, state) {
                continue;
            }
            let score = square_value_reoccupy(state, cache, &apid, msq);
            threats.push(ScoredMove {
                promotion: None,
                pid: apid,
                to: msq,
                score,
            });
        }
    }

    rank_moves(&mut threats);
    let gravest = threats.into_iter().next()?;
    if gravest.score < 0 {
        return None;
    }
    let mut defense = defend_piece_on_square(state, cache, &gravest.pid, gravest.to)?;
    defense.score += gravest.score;
    Some(defense)
}

/// Defend the piece on `at` against `attacker`: capture the attacker,
/// interpose, move away, or reinforce with another defender.
fn defend_piece_on_square(
    state: &GameState,
    cache: &mut ScoreCache,
    attacker: &PieceId,
    at: Square,
) -> Option<ScoredMove> {
    debug!("entered defend_piece_on_square");
    let attacked_id = state.id_at(at)?.clone();
    let attacked = state.piece(&attacked_id).ok()?;
    let mut scored: Vec<ScoredMove> = Vec::new();

    if attacked.attacked_by.len() == 1 {
        let attacker_piece = state.piece(attacker).ok()?;
        let attacker_sq = attacker_piece.square?;

        // Capture the attacker (en-passant reaches it sideways)
        for ccpid in attacker_piece.attacked_by.clone() {
            let ccpiece = match state.piece(&ccpid) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let cc_to = if ccpid.is_pawn() && attacker.is_pawn() {
                en_passant_landing(state, attacked_id.side(), attacker_sq)
                    .filter(|landing| ccpiece.legals.contains(landing))
                    .unwrap_or(attacker_sq)
            } else {
                attacker_sq
            };
            if !ccpiece.legals.contains(&cc_to) || ccpiece.is_pinned(cc_to, state) {
                continue;
            }
            let score = square_value_reoccupy(state, cache, &ccpid, cc_to);
            scored.push(ScoredMove {
                promotion: choose_promotion(state, &ccpid, cc_to),
                pid: ccpid,
                to: cc_to,
                score,
            });
        }

        // Interpose on the attack line
        for (ipid, ito) in state.intercept_alignment(&attacked_id, attacker_sq) {
            let ipiece = match state.piece(&ipid) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if ipiece.is_pinned(ito, state) {
                continue;
            }
            let score = square_value_reoccupy(state, cache, &ipid, ito);
            scored.push(ScoredMove {
                promotion: choose_promotion(state, &ipid, ito),
                pid: ipid,
                to: ito,
                score,
            });
        }
    }

    // Move the attacked piece out of the line of fire
    let attacker_square = state.square_of(attacker);
    for &to in &attacked.legals {
        if Some(to) == attacker_square {
            // capturing the attacker is already covered above
            continue;
        }
        if attacked.is_pinned(to, state) {
            continue;
        }
        let score = square_value_reoccupy(state, cache, &attacked_id, to);
        scored.push(ScoredMove {
            pid: attacked_id.clone(),
            to,
            promotion: None,
            score,
        });
    }

    rank_moves(&mut scored);
    if let Some(best) = scored.first() {
        if best.score >= 0 {
            return scored.into_iter().next();
        }
    }

    // Nothing works outright; reinforce the attacked piece instead
    // (not an option when the attacked piece is the king).
    if !attacked_id.is_king() {
        for &acc in &attacked.accessors {
            for pid in state.ids_of(attacked_id.side()) {
                if pid.is_king() {
                    continue;
                }
                let piece = match state.piece(&pid) {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                if !piece.legals.contains(&acc) {
                    continue;
                }
                let drctn = match direction_between(acc, at) {
                    Some(d) => d,
                    None => continue,
                };
                if !piece.directions().contains(&drctn) {
                    continue;
                }
                if pid.is_pawn()
                    && !(ORDINALS.contains(&drctn) && step(drctn, acc) == Some(at))
                {
                    continue;
                }
                if piece.is_pinned(acc, state) {
                    continue;
                }
                let score = square_value_reoccupy(state, cache, &pid, acc);
                scored.push(ScoredMove {
                    promotion: choose_promotion(state, &pid, acc),
                    pid,
                    to: acc,
                    score,
                });
            }
        }
        rank_moves(&mut scored);
    }

    scored.into_iter().next()
}
