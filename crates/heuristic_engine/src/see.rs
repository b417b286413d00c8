//! Static exchange evaluation: simulate the capture sequence on one
//! square and return the net material delta for the side that moves
//! first, without any search.

use std::collections::HashMap;

use pinion_core::exchange::square_exchangers;
use pinion_core::geometry::{rank_of, Square};
use pinion_core::piece::{PieceId, Role, Side};
use pinion_core::state::GameState;

/// A pinned mover may not enter the exchange at all.
pub const PINNED_MOVE_SCORE: i32 = -1000;

/// Per-computation score memo: one selector pass scores the same
/// (piece, destination) pair from several strategies.
#[derive(Default)]
pub struct ScoreCache {
    scores: HashMap<(PieceId, Square), i32>,
}

impl ScoreCache {
    pub fn new() -> ScoreCache {
        ScoreCache::default()
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }
}

/// A candidate move with its exchange score attached.
#[derive(Clone, Debug)]
pub struct ScoredMove {
    pub pid: PieceId,
    pub to: Square,
    pub promotion: Option<PieceId>,
    pub score: i32,
}

/// Highest score first; among equal scores the cheaper piece leads.
pub fn rank_moves(moves: &mut [ScoredMove]) {
    moves.sort_by(|a, b| {
        if a.score == b.score {
            let a_key = a.score + a.pid.role().base_worth();
            let b_key = b.score + b.pid.role().base_worth();
            a_key.cmp(&b_key)
        } else {
            b.score.cmp(&a.score)
        }
    });
}

/// Net material outcome of `mover` occupying `to`, from the mover's
/// side's perspective.
pub fn square_value_reoccupy(
    state: &GameState,
    cache: &mut ScoreCache,
    mover: &PieceId,
    to: Square,
) -> i32 {
    let key = (mover.clone(), to);
    if let Some(&score) = cache.scores.get(&key) {
        return score;
    }
    let score = run_exchange(state, mover, to, mover.role().base_worth());
    cache.scores.insert(key, score);
    score
}

/// The exchange simulation proper. `mover_rank` is the worth of the
/// piece standing on `to` after the first move, which for a promotion
/// is the chosen role rather than the pawn.
fn run_exchange(state: &GameState, mover: &PieceId, to: Square, mover_rank: i32) -> i32 {
    let mover_piece = match state.piece(mover) {
        Ok(p) => p,
        Err(_) => return PINNED_MOVE_SCORE,
    };
    if mover_piece.is_pinned(to, state) {
        return PINNED_MOVE_SCORE;
    }

    let captured_rank = state
        .id_at(to)
        .map(|cid| cid.role().base_worth())
        .unwrap_or(0);

    let pools = square_exchangers(state, mover, to);
    let (mine, theirs) = match mover.side() {
        Side::White => (&pools.white, &pools.black),
        Side::Black => (&pools.black, &pools.white),
    };
    let mut my_pool: Vec<(PieceId, i32)> =
        mine.iter().map(|e| (e.pid.clone(), e.worth)).collect();
    let mut their_pool: Vec<(PieceId, i32)> =
        theirs.iter().map(|e| (e.pid.clone(), e.worth)).collect();

    // A king never initiates onto a defended square, unless the sole
    // defender is pinned off the line.
    if mover.is_king() && !their_pool.is_empty() {
        let sole_defender_pinned = their_pool.len() == 1
            && state
                .piece(&their_pool[0].0)
                .map(|p| p.is_pinned(to, state))
                .unwrap_or(false);
        if sole_defender_pinned {
            their_pool.clear();
        } else {
            return -mover_rank;
        }
    }

    sort_cheapest_first(&mut my_pool);
    sort_cheapest_first(&mut their_pool);
    my_pool.insert(0, (mover.clone(), mover_rank));

    let mut my_score = 0;
    let mut their_score = 0;
    let mut my_move = true;
    // Worth of whatever currently stands on the contested square
    let mut at_risk = captured_rank;

    loop {
        let pool = if my_move { &mut my_pool } else { &mut their_pool };
        if pool.is_empty() {
            break;
        }
        let (pid, rank) = pool.remove(0);
        let opponent_can_reply = if my_move {
            !their_pool.is_empty()
        } else {
            !my_pool.is_empty()
        };
        if pid.is_king() && opponent_can_reply {
            // the king would be recaptured; it stays out
            break;
        }
        if my_move {
            my_score += at_risk;
        } else {
            their_score += at_risk;
        }
        at_risk = rank;
        my_move = !my_move;
        if !my_move && their_score > my_score {
            // continuing the exchange is already losing
            break;
        }
    }
    my_score - their_score
}

fn sort_cheapest_first(pool: &mut [(PieceId, i32)]) {
    // Kings always last, whatever their nominal rank
    pool.sort_by_key(|(pid, rank)| if pid.is_king() { i32::MAX } else { *rank });
}

/// Promotion choice through the evaluator: every candidate role is
/// scored as if it already stood on the target square, best role wins.
/// `None` for anything but a pawn reaching its back rank.
pub fn choose_promotion(state: &GameState, pid: &PieceId, to: Square) -> Option<PieceId> {
    if !pid.is_pawn() {
        return None;
    }
    let side = pid.side();
    let back_rank = match side {
        Side::White => 7,
        Side::Black => 0,
    };
    if rank_of(to) != back_rank {
        return None;
    }
    let mut best: Option<(Role, i32)> = None;
    for role in [Role::Queen, Role::Rook, Role::Bishop, Role::Knight] {
        let score = run_exchange(state, pid, to, role.base_worth());
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((role, score)),
        }
    }
    best.map(|(role, _)| state.next_promotion_id(side, role))
}

#[cfg(test)]
#[path = "see_tests.rs"]
mod see_tests;
