//! King-hunt: with no immediate tactic on the board, reposition onto
//! squares that bear on the enemy king's access squares, slowly
//! shrinking its box.

use tracing::debug;

use pinion_core::geometry::{direction_between, step, Square, ORDINALS};
use pinion_core::piece::PieceId;
use pinion_core::state::GameState;
use pinion_core::GeneratedMove;

use crate::see::{choose_promotion, rank_moves, square_value_reoccupy, ScoreCache, ScoredMove};

pub fn king_hunt(state: &GameState, cache: &mut ScoreCache) -> Option<GeneratedMove> {
    debug!("entered king_hunt");
    let me = state.side_to_move();
    let opp_king = state.piece(&PieceId::king(me.other())).ok()?;
    let k_sq = opp_king.square?;
    let accessors = opp_king.accessors.clone();

    let mut posts: Vec<(PieceId, Square)> = Vec::new();
    for pid in state.ids_of(me) {
        if pid.is_king() {
            continue;
        }
        let piece = match state.piece(&pid) {
            Ok(p) => p,
            Err(_) => continue,
        };
        for &post in &piece.legals {
            for &target in &accessors {
                let d = match direction_between(post, target) {
                    Some(d) => d,
                    None => continue,
                };
                if !piece.directions().contains(&d) {
                    continue;
                }
                if pid.is_pawn() && !(ORDINALS.contains(&d) && step(d, post) == Some(target)) {
                    continue;
                }
                // From the access square the piece must also bear on
                // the king itself
                let kd = match direction_between(target, k_sq) {
                    Some(d) => d,
                    None => continue,
                };
                if !piece.directions().contains(&kd) {
                    continue;
                }
                // The approach line must be clear up to the target
                match state.first_occupant_along(post, d) {
                    None => {}
                    Some(occ) if occ == target => {
                        match state.piece_at(occ) {
                            Some(p) if p.side != me => {}
                            _ => continue,
                        }
                    }
                    Some(_) => continue,
                }
                if !posts.contains(&(pid.clone(), post)) {
                    posts.push((pid.clone(), post));
                }
            }
        }
    }

    let mut scored: Vec<ScoredMove> = Vec::new();
    for (pid, post) in posts {
        let score = square_value_reoccupy(state, cache, &pid, post);
        scored.push(ScoredMove {
            promotion: choose_promotion(state, &pid, post),
            pid,
            to: post,
            score,
        });
    }
    rank_moves(&mut scored);
    let best = scored.into_iter().next()?;
    if best.score < 0 {
        return None;
    }
    Some(GeneratedMove {
        pid: best.pid,
        to: best.to,
        promotion: best.promotion,
    })
}
