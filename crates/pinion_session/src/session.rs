//! The interactive session: a square-at-a-time submission state
//! machine over the rules engine. Humans and the selector drive the
//! same entry points, so every move passes one legality path.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pinion_core::geometry::Square;
use pinion_core::notation::is_result_token;
use pinion_core::piece::{PieceId, Role, Side};
use pinion_core::state::GameState;
use pinion_core::GeneratedMove;

use crate::repetition::RepetitionTracker;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Computer,
}

/// Outcome of one square (or promotion-role) submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Nothing changed: wrong side, paused, or not a usable square.
    Rejected,
    /// A pending selection was dropped.
    Cleared,
    /// A piece was picked up; highlight data for the rendering layer.
    Selected(SelectionView),
    /// A move was applied and recorded.
    Applied { notation: String },
    /// Destination committed, promotion choice outstanding.
    PromotionPending { square: Square },
    /// The mover had no legal king move and claimed the draw.
    DrawClaimed,
    /// The game has already ended.
    GameOver,
}

/// Squares the rendering layer highlights for the current selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionView {
    pub square: Square,
    pub legals: Vec<Square>,
    pub attacking: Vec<Square>,
    pub attacked_by: Vec<Square>,
    pub defending: Vec<Square>,
    pub defended_by: Vec<Square>,
}

pub struct Session {
    state: GameState,
    white: PlayerKind,
    black: PlayerKind,
    selected: Option<Square>,
    paused: bool,
    repetition: RepetitionTracker,
}

impl Session {
    pub fn new(white: PlayerKind, black: PlayerKind) -> Session {
        Session::with_state(GameState::new(), white, black)
    }

    /// A session over a prepared position (tests, resumed games).
    pub fn with_state(state: GameState, white: PlayerKind, black: PlayerKind) -> Session {
        let repetition = RepetitionTracker::new(state.position_hash());
        Session {
            state,
            white,
            black,
            selected: None,
            paused: false,
            repetition,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn player_for(&self, side: Side) -> PlayerKind {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    pub fn current_player(&self) -> PlayerKind {
        self.player_for(self.state.side_to_move())
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn game_over(&self) -> bool {
        matches!(self.state.last_move(), Some(m) if is_result_token(m))
    }

    pub fn new_game(&mut self) {
        info!("new game");
        self.state = GameState::new();
        self.repetition = RepetitionTracker::new(self.state.position_hash());
        self.selected = None;
        self.paused = false;
    }

    /// The single entry point for board interaction. Semantics depend
    /// on controller state: pick a piece, commit a destination, or
    /// claim a draw by selecting the opposing king when the mover's
    /// own king has no legal move.
    pub fn submit_square(&mut self, square: Square) -> Submission {
        if self.paused {
            return Submission::Rejected;
        }
        if self.game_over() {
            return Submission::GameOver;
        }
        if self.state.promotion_pending().is_some() {
            return Submission::Rejected;
        }
        let current = self.state.side_to_move();

        let opposing_king_selected = self
            .state
            .piece_at(square)
            .map(|piece| piece.role == Role::King && piece.side != current)
            .unwrap_or(false);
        if opposing_king_selected && self.state.king(current).legals.is_empty() {
            // A stuck mover signals the draw on the opposing king
            self.state.record_draw();
            self.selected = None;
            info!("draw claimed: no legal king move");
            return Submission::DrawClaimed;
        }

        match self.selected {
            None => self.select_piece(square, current),
            Some(from) => self.commit_destination(from, square),
        }
    }

    fn select_piece(&mut self, square: Square, current: Side) -> Submission {
        let view = match self.state.piece_at(square) {
            Some(piece) if piece.side == current => SelectionView {
                square,
                legals: piece.legals.clone(),
                attacking: self.state.squares_of(&piece.attacking),
                attacked_by: self.state.squares_of(&piece.attacked_by),
                defending: self.state.squares_of(&piece.defending),
                defended_by: self.state.squares_of(&piece.defended_by),
            },
            _ => return Submission::Rejected,
        };
        self.selected = Some(square);
        Submission::Selected(view)
    }

    fn commit_destination(&mut self, from: Square, to: Square) -> Submission {
        self.selected = None;
        let piece = match self.state.piece_at(from) {
            Some(p) => p,
            None => return Submission::Rejected,
        };
        if !piece.legals.contains(&to) {
            return Submission::Cleared;
        }
        // Re-derive king safety independently of the cached legal sets
        if !self.state.escapes_check(from, to) || self.state.self_check(from, to) {
            debug!("submission would leave the king in check, rejected");
            return Submission::Rejected;
        }
        let pid = piece.id.clone();
        let notation = self
            .state
            .compose_move(&pid, to)
            .expect("a selected piece composes its own move");
        let recorded = self
            .state
            .process_move(&notation)
            .expect("a validated move always applies");
        info!(mv = %recorded, "applied");
        if let Some(square) = self.state.promotion_pending() {
            return Submission::PromotionPending { square };
        }
        self.after_move();
        Submission::Applied { notation: recorded }
    }

    /// Completes an outstanding promotion with the chosen role.
    pub fn submit_promotion(&mut self, role: Role) -> Submission {
        if self.paused {
            return Submission::Rejected;
        }
        if self.state.promotion_pending().is_none() {
            return Submission::Rejected;
        }
        let side = self.state.side_to_move();
        let promoted = self.state.next_promotion_id(side, role);
        let notation = self
            .state
            .compose_promotion(&promoted)
            .expect("a pending promotion has a phase-one entry");
        let recorded = self
            .state
            .process_move(&notation)
            .expect("a promotion choice always applies");
        info!(mv = %recorded, "promoted");
        self.after_move();
        Submission::Applied { notation: recorded }
    }

    /// Replays a selector proposal through the same submission steps a
    /// human takes: source square, destination square, promotion role.
    pub fn apply_generated(&mut self, mv: &GeneratedMove) -> Submission {
        let from = match self.state.square_of(&mv.pid) {
            Some(sq) => sq,
            None => return Submission::Rejected,
        };
        match self.submit_square(from) {
            Submission::Selected(_) => {}
            other => return other,
        }
        match self.submit_square(mv.to) {
            Submission::PromotionPending { .. } => {
                let role = mv
                    .promotion
                    .as_ref()
                    .map(PieceId::role)
                    .unwrap_or(Role::Queen);
                self.submit_promotion(role)
            }
            other => other,
        }
    }

    fn after_move(&mut self) {
        if self.game_over() {
            return;
        }
        let hash = self.state.position_hash();
        if self.repetition.record(hash) {
            info!("threefold repetition");
            self.state.record_draw();
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
