//! Exchange listing: for a candidate occupation of a square, the first
//! eligible exchanger along every direction, grouped per side. Several
//! independent lines can bear on one square at once, so the pools stay
//! partitioned by line of approach rather than flattening into a
//! single stack.

use crate::geometry::{direction_between, step, Direction, Square, ALL_DIRECTIONS, ORDINALS};
use crate::piece::{PieceId, Role, Side};
use crate::state::GameState;

/// One piece able to join an exchange on the target square, with its
/// material worth and the line it approaches along.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchanger {
    pub pid: PieceId,
    pub worth: i32,
    pub direction: Direction,
}

/// Next-eligible-attacker pools, one entry per bearing direction,
/// split by side.
#[derive(Clone, Debug, Default)]
pub struct ExchangerPools {
    pub white: Vec<Exchanger>,
    pub black: Vec<Exchanger>,
}

impl ExchangerPools {
    pub fn of(&self, side: Side) -> &[Exchanger] {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

/// Scans all sixteen directions outward from `target` and records, per
/// direction, the first piece that could take part in an exchange
/// there. Eligibility follows potential-move derivation, with three
/// deviations: pawns only ever exchange diagonally onto the square,
/// kings must stand exactly one step away, and a piece pinned along an
/// unrelated line is passed over (it cannot leave its pin line, so it
/// neither joins nor blocks the count). The mover itself, and anything
/// behind it, never joins.
pub fn square_exchangers(state: &GameState, mover: &PieceId, target: Square) -> ExchangerPools {
    let mut pools = ExchangerPools::default();
    for drctn in ALL_DIRECTIONS {
        let mut sq = target;
        while let Some(next) = step(drctn, sq) {
            sq = next;
            let piece = match state.piece_at(sq) {
                Some(p) => p,
                None => {
                    if drctn.is_half_wind() {
                        break;
                    }
                    continue;
                }
            };
            if &piece.id == mover {
                break;
            }
            if let Some(pinner) = &piece.kpin {
                if !pin_line_reaches(state, piece.side, pinner, target) && pinner != mover {
                    // pinned along an unrelated line: skip past it
                    if drctn.is_half_wind() {
                        break;
                    }
                    continue;
                }
            }
            let eligible = match piece.role {
                Role::Pawn => {
                    let pdrctn = direction_between(sq, target);
                    match pdrctn {
                        Some(d) => {
                            ORDINALS.contains(&d)
                                && piece.directions().contains(&d)
                                && step(d, sq) == Some(target)
                        }
                        None => false,
                    }
                }
                Role::King => {
                    piece.directions().contains(&drctn) && step(drctn, target) == Some(sq)
                }
                _ => piece.directions().contains(&drctn),
            };
            if eligible {
                let exchanger = Exchanger {
                    pid: piece.id.clone(),
                    worth: state.piece_worth(&piece.id),
                    direction: drctn,
                };
                match piece.side {
                    Side::White => pools.white.push(exchanger),
                    Side::Black => pools.black.push(exchanger),
                }
            }
            break;
        }
    }
    pools
}

/// True when the target square lies on the line between the pinned
/// piece's king and its pinner, so exchanging there keeps the pin
/// honored.
fn pin_line_reaches(state: &GameState, pinned_side: Side, pinner: &PieceId, target: Square) -> bool {
    let king_sq = state.king_square(pinned_side);
    match state.square_of(pinner) {
        Some(pinner_sq) => {
            let pin_line = direction_between(king_sq, pinner_sq);
            pin_line.is_some() && pin_line == direction_between(king_sq, target)
        }
        None => false,
    }
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod exchange_tests;
