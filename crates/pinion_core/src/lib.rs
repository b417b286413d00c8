pub mod error;
pub mod exchange;
pub mod fixtures;
pub mod geometry;
pub mod notation;
pub mod piece;
pub mod state;

// Re-export core game logic (not selector-specific)
pub use error::*;
pub use exchange::*;
pub use geometry::*;
pub use notation::*;
pub use piece::*;
pub use state::*;

use crate::piece::PieceId;

// =============================================================================
// Selector trait — implemented by automated opponents
// =============================================================================

/// A move proposed by an automated opponent: the piece, its destination
/// and, for a promoting pawn, the identity it should assume.
///
/// The selector never mutates state itself; the session replays the
/// proposal through the same square-submission path a human uses, so
/// the AI cannot diverge from the legality checks of manual play.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedMove {
    pub pid: PieceId,
    pub to: geometry::Square,
    pub promotion: Option<PieceId>,
}

/// Trait for automated move selection.
///
/// Implementations consume read-only state queries and return a
/// proposal, or `None` when the side to move has nothing to play.
pub trait Selector {
    /// Choose a move for the side to move. `last_move` is the most
    /// recent notation entry, carrying the check/mate suffix the
    /// selector reacts to.
    fn select(&mut self, state: &state::GameState, last_move: Option<&str>)
        -> Option<GeneratedMove>;

    /// Selector name for logs and match records.
    fn name(&self) -> &str;
}
