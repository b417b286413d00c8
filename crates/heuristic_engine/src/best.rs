//! Best-available-move: score every legal move through the exchange
//! evaluator and pick uniformly among the top-scoring ties.

use rand::seq::SliceRandom;
use rand::thread_rng;
use tracing::debug;

use pinion_core::state::GameState;
use pinion_core::GeneratedMove;

use crate::see::{choose_promotion, rank_moves, square_value_reoccupy, ScoreCache, ScoredMove};

pub fn best_available(state: &GameState, cache: &mut ScoreCache) -> Option<GeneratedMove> {
    debug!("entered best_available");
    let me = state.side_to_move();
    let mut scored: Vec<ScoredMove> = Vec::new();

    for pid in state.ids_of(me) {
        let piece = match state.piece(&pid) {
            Ok(p) => p,
            Err(_) => continue,
        };
        for &to in &piece.legals {
            let score = square_value_reoccupy(state, cache, &pid, to);
            scored.push(ScoredMove {
                promotion: choose_promotion(state, &pid, to),
                pid: pid.clone(),
                to,
                score,
            });
        }
    }
    if scored.is_empty() {
        return None;
    }
    rank_moves(&mut scored);
    let top = scored[0].score;
    let ties: Vec<&ScoredMove> = scored.iter().take_while(|mv| mv.score == top).collect();
    let pick = ties.choose(&mut thread_rng())?;
    Some(GeneratedMove {
        pid: pick.pid.clone(),
        to: pick.to,
        promotion: pick.promotion.clone(),
    })
}
