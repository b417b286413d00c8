//! Error taxonomy for the rules engine.
//!
//! Illegal move attempts are rejected at the submission boundary without
//! mutating state. Malformed notation and missing-piece lookups are
//! contract violations: notation is only ever generated internally or
//! read from trusted fixtures, so these surface loudly instead of
//! degrading into silent nulls.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Destination is not legal for the piece, or the move would leave
    /// the mover's own king in check.
    #[error("illegal move: {pid} to {to}")]
    IllegalMove { pid: String, to: String },

    /// Move text failed to parse against the notation grammar.
    #[error("malformed move notation: {0:?}")]
    MalformedNotation(String),

    /// A piece identifier failed validation.
    #[error("invalid piece id: {0:?}")]
    InvalidPieceId(String),

    /// A lookup expected a live piece that is not in the registry.
    #[error("no piece registered for id {0}")]
    MissingPiece(String),

    /// A lookup expected an occupied square.
    #[error("no piece occupies {0}")]
    VacantSquare(String),

    /// The piece registry and the occupancy index disagree.
    #[error("inconsistent board state: {0}")]
    Inconsistent(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
