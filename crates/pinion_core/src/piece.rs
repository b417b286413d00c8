//! The piece model: sides, roles with their movement capability carried
//! as data, stable string identifiers, and the per-piece relational
//! fields (potentials, legals, accessors, attack/defense lists, pin and
//! shadow marks) the state recomputes after every mutation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};
use crate::geometry::{
    direction_between, file_of, rank_of, Direction, Square, CARDINALS, HALF_WINDS, ORDINALS,
    ROYALS,
};
use crate::state::GameState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn idx(self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Side::White => 'W',
            Side::Black => 'B',
        }
    }

    pub fn from_letter(c: char) -> Option<Side> {
        match c {
            'W' => Some(Side::White),
            'B' => Some(Side::Black),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

const WHITE_PAWN_DIRECTIONS: [Direction; 3] = [Direction::NE, Direction::N, Direction::NW];
const BLACK_PAWN_DIRECTIONS: [Direction; 3] = [Direction::SE, Direction::S, Direction::SW];

impl Role {
    pub fn letter(self) -> char {
        match self {
            Role::King => 'K',
            Role::Queen => 'Q',
            Role::Rook => 'R',
            Role::Bishop => 'B',
            Role::Knight => 'N',
            Role::Pawn => 'P',
        }
    }

    pub fn from_letter(c: char) -> Option<Role> {
        match c {
            'K' => Some(Role::King),
            'Q' => Some(Role::Queen),
            'R' => Some(Role::Rook),
            'B' => Some(Role::Bishop),
            'N' => Some(Role::Knight),
            'P' => Some(Role::Pawn),
            _ => None,
        }
    }

    pub fn idx(self) -> usize {
        match self {
            Role::King => 0,
            Role::Queen => 1,
            Role::Rook => 2,
            Role::Bishop => 3,
            Role::Knight => 4,
            Role::Pawn => 5,
        }
    }

    /// Movement capability: the direction set this role may travel.
    /// Pawns are side-asymmetric (forward plus both forward diagonals).
    pub fn directions(self, side: Side) -> &'static [Direction] {
        match self {
            Role::King | Role::Queen => &ROYALS,
            Role::Rook => &CARDINALS,
            Role::Bishop => &ORDINALS,
            Role::Knight => &HALF_WINDS,
            Role::Pawn => match side {
                Side::White => &WHITE_PAWN_DIRECTIONS,
                Side::Black => &BLACK_PAWN_DIRECTIONS,
            },
        }
    }

    /// King, knight and pawn take a single step per move; the rest slide.
    pub fn single_step(self) -> bool {
        matches!(self, Role::King | Role::Knight | Role::Pawn)
    }

    /// Static material rank used by the exchange evaluator. Pawn worth
    /// is positional (advancement-based); this is its base rank.
    pub fn base_worth(self) -> i32 {
        match self {
            Role::King => 1000,
            Role::Queen => 18,
            Role::Rook => 10,
            Role::Bishop => 8,
            Role::Knight => 6,
            Role::Pawn => 2,
        }
    }
}

/// Stable piece identifier: side letter, positional disambiguator and a
/// trailing role letter, e.g. `WQR` (white queen-side rook), `BKNP`
/// (black king-knight pawn), `W1Q` (white's first promoted queen).
/// The identifier survives for the piece's lifetime; promotion retires
/// the pawn id and mints a fresh one with a new counter.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PieceId(String);

impl PieceId {
    pub fn new(text: &str) -> EngineResult<PieceId> {
        let bytes = text.as_bytes();
        if bytes.len() < 2 {
            return Err(EngineError::InvalidPieceId(text.to_string()));
        }
        let side_ok = matches!(bytes[0], b'W' | b'B');
        let role_ok = matches!(bytes[bytes.len() - 1], b'K' | b'Q' | b'R' | b'B' | b'N' | b'P');
        let middle_ok = bytes[1..bytes.len() - 1]
            .iter()
            .all(|b| matches!(b, b'K' | b'Q' | b'R' | b'B' | b'N' | b'0'..=b'9'));
        if side_ok && role_ok && middle_ok {
            Ok(PieceId(text.to_string()))
        } else {
            Err(EngineError::InvalidPieceId(text.to_string()))
        }
    }

    pub fn king(side: Side) -> PieceId {
        PieceId(format!("{}K", side.letter()))
    }

    /// Identifier for a promoted piece: side, promotion counter, role.
    pub fn promoted(side: Side, counter: u32, role: Role) -> PieceId {
        PieceId(format!("{}{}{}", side.letter(), counter, role.letter()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn side(&self) -> Side {
        Side::from_letter(self.0.chars().next().unwrap()).unwrap()
    }

    pub fn role(&self) -> Role {
        Role::from_letter(self.0.chars().last().unwrap()).unwrap()
    }

    pub fn is_king(&self) -> bool {
        self.role() == Role::King
    }

    pub fn is_pawn(&self) -> bool {
        self.role() == Role::Pawn
    }
}

impl TryFrom<String> for PieceId {
    type Error = EngineError;

    fn try_from(value: String) -> EngineResult<PieceId> {
        PieceId::new(&value)
    }
}

impl From<PieceId> for String {
    fn from(id: PieceId) -> String {
        id.0
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One live board piece. Relational fields are derived data, rebuilt by
/// the owning state after every mutation; nothing outside the state
/// holds a `Piece` reference across moves.
#[derive(Clone, Debug)]
pub struct Piece {
    pub id: PieceId,
    pub side: Side,
    pub role: Role,
    pub square: Option<Square>,
    pub moved: bool,

    /// Squares reachable ignoring check-safety.
    pub potentials: Vec<Square>,
    /// Potentials that survive the legality filters.
    pub legals: Vec<Square>,
    /// Squares this piece can be approached from, including squares
    /// occupied by its own side (used for defense counting).
    pub accessors: Vec<Square>,
    pub attacking: Vec<PieceId>,
    pub attacked_by: Vec<PieceId>,
    pub defending: Vec<PieceId>,
    pub defended_by: Vec<PieceId>,

    /// Enemy piece pinning this piece against its own king.
    pub kpin: Option<PieceId>,
    /// Own-side piece whose check on the opposing king this piece is
    /// blocking; moving uncovers the discovered check.
    pub kshadow: Option<PieceId>,
}

impl Piece {
    pub fn new(id: PieceId, square: Square) -> Piece {
        let side = id.side();
        let role = id.role();
        let moved = initially_moved(&id, side, role, square);
        Piece {
            id,
            side,
            role,
            square: Some(square),
            moved,
            potentials: Vec::new(),
            legals: Vec::new(),
            accessors: Vec::new(),
            attacking: Vec::new(),
            attacked_by: Vec::new(),
            defending: Vec::new(),
            defended_by: Vec::new(),
            kpin: None,
            kshadow: None,
        }
    }

    pub fn directions(&self) -> &'static [Direction] {
        self.role.directions(self.side)
    }

    /// Capability-and-distance alignment test against a target square.
    /// Occupancy is not consulted; callers only ever test the nearest
    /// occupant along a scanned ray.
    pub fn aligned_with(&self, target: Square) -> bool {
        let from = match self.square {
            Some(sq) => sq,
            None => return false,
        };
        let drctn = match direction_between(from, target) {
            Some(d) => d,
            None => return false,
        };
        if !self.directions().contains(&drctn) {
            return false;
        }
        let df = (file_of(target) - file_of(from)).abs();
        let dr = (rank_of(target) - rank_of(from)).abs();
        match self.role {
            // One step along an adjacent line
            Role::King => df <= 1 && dr <= 1,
            // Capture squares only: one rank forward on a diagonal
            Role::Pawn => ORDINALS.contains(&drctn) && dr == 1,
            // direction_between only yields a half-wind for exact leaps
            Role::Knight => true,
            Role::Queen | Role::Rook | Role::Bishop => true,
        }
    }

    /// A pinned piece may only move along the line between its king and
    /// the pinning piece, capturing the pinner included. True means the
    /// destination abandons the pin line and the move is disallowed.
    pub fn is_pinned(&self, destination: Square, state: &GameState) -> bool {
        let pinner = match &self.kpin {
            Some(pid) => pid,
            None => return false,
        };
        let king_sq = state.king_square(self.side);
        let pinner_sq = match state.square_of(pinner) {
            Some(sq) => sq,
            None => return false,
        };
        direction_between(king_sq, destination) != direction_between(king_sq, pinner_sq)
    }

    /// True when moving to `destination` departs the shadow line and
    /// uncovers the covered piece's check on the opposing king.
    pub fn is_shadowed(&self, destination: Square, state: &GameState) -> bool {
        let shadow = match &self.kshadow {
            Some(pid) => pid,
            None => return false,
        };
        let king_sq = state.king_square(self.side.other());
        let shadow_sq = match state.square_of(shadow) {
            Some(sq) => sq,
            None => return false,
        };
        direction_between(king_sq, destination) != direction_between(king_sq, shadow_sq)
    }
}

fn initially_moved(id: &PieceId, side: Side, role: Role, square: Square) -> bool {
    let name = crate::geometry::square_name(square);
    match role {
        Role::King => match side {
            Side::White => name != "e1",
            Side::Black => name != "e8",
        },
        Role::Rook => {
            // Only the two original rooks may castle; a promoted rook
            // carries no K/Q indicator and counts as moved.
            let indicator = id.as_str().chars().nth(1);
            match (side, indicator) {
                (Side::White, Some('K')) => name != "h1",
                (Side::White, Some('Q')) => name != "a1",
                (Side::Black, Some('K')) => name != "h8",
                (Side::Black, Some('Q')) => name != "a8",
                _ => true,
            }
        }
        Role::Pawn => match side {
            Side::White => rank_of(square) != 1,
            Side::Black => rank_of(square) != 6,
        },
        _ => false,
    }
}

#[cfg(test)]
#[path = "piece_tests.rs"]
mod piece_tests;
