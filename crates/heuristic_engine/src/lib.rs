//! Heuristic Move Selector
//!
//! The automated opponent: a prioritized chain of single-ply
//! strategies over a static-exchange evaluator, not a depth-N search.
//! Order: escape-from-check (when the last move gave check), then
//! deliver-mate, consider-captures, king-hunt, and finally the best
//! scored move with random tie-breaking.

mod best;
mod captures;
mod escape;
mod hunt;
mod mate;
pub mod see;

use tracing::debug;

use pinion_core::notation::is_result_token;
use pinion_core::state::GameState;
use pinion_core::{GeneratedMove, Selector};

use crate::see::ScoreCache;

pub use crate::see::{choose_promotion, square_value_reoccupy};

/// Strategy-chain move selector. Holds only the per-computation score
/// cache; every call starts from a fresh one.
#[derive(Default)]
pub struct MoveSelector {
    cache: ScoreCache,
}

impl MoveSelector {
    pub fn new() -> MoveSelector {
        MoveSelector::default()
    }
}

impl Selector for MoveSelector {
    fn select(&mut self, state: &GameState, last_move: Option<&str>) -> Option<GeneratedMove> {
        self.cache.clear();

        if let Some(last) = last_move {
            if is_result_token(last) || last.ends_with('#') || last.ends_with('=') {
                // game over (or a promotion is pending); nothing to play
                return None;
            }
            if last.ends_with('+') {
                debug!("in check, escaping");
                if let Some(mv) = escape::escape_check(state, &mut self.cache) {
                    return Some(mv);
                }
            }
        }

        mate::deliver_mate(state, &mut self.cache)
            .or_else(|| captures::consider_captures(state, &mut self.cache))
            .or_else(|| hunt::king_hunt(state, &mut self.cache))
            .or_else(|| best::best_available(state, &mut self.cache))
    }

    fn name(&self) -> &str {
        "Heuristic v1.0"
    }
}
