//! Escape-from-check: runs instead of the strategy chain whenever the
//! opponent's last move delivered check. Weighs capturing the sole
//! checker, interposing, and king flight, through the exchange
//! evaluator.

use tracing::debug;

use pinion_core::piece::PieceId;
use pinion_core::state::GameState;
use pinion_core::GeneratedMove;

use crate::see::{choose_promotion, rank_moves, square_value_reoccupy, ScoreCache, ScoredMove};

pub fn escape_check(state: &GameState, cache: &mut ScoreCache) -> Option<GeneratedMove> {
    debug!("entered escape_check");
    let side = state.side_to_move();
    let king_id = PieceId::king(side);
    let king = state.piece(&king_id).ok()?;
    let checkers = king.attacked_by.clone();

    let mut scored: Vec<ScoredMove> = Vec::new();

    if checkers.len() == 1 {
        let checker = &checkers[0];
        let checker_piece = state.piece(checker).ok()?;
        let checker_sq = checker_piece.square?;

        // Capture the checker
        for capturer in checker_piece.attacked_by.clone() {
            let piece = state.piece(&capturer).ok()?;
            if !piece.legals.contains(&checker_sq) || piece.is_pinned(checker_sq, state) {
                continue;
            }
            let score = square_value_reoccupy(state, cache, &capturer, checker_sq);
            scored.push(ScoredMove {
                promotion: choose_promotion(state, &capturer, checker_sq),
                pid: capturer,
                to: checker_sq,
                score,
            });
        }

        // Interpose between checker and king
        for (ipid, ito) in state.intercept_alignment(&king_id, checker_sq) {
            let piece = state.piece(&ipid).ok()?;
            if piece.is_pinned(ito, state) {
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

    // King flight, worth whatever it captures on the way
    for &to in &king.legals {
        let score = state
            .id_at(to)
            .map(|occupant| occupant.role().base_worth())
            .unwrap_or(0);
        scored.push(ScoredMove {
            pid: king_id.clone(),
            to,
            promotion: None,
            score,
        });
    }

    rank_moves(&mut scored);
    scored.into_iter().next().map(|mv| GeneratedMove {
        pid: mv.pid,
        to: mv.to,
        promotion: mv.promotion,
    })
}
