//! Authoritative game state: the piece registry, the square occupancy
//! index, turn/en-passant/promotion bookkeeping and the move list.
//!
//! Every public mutation runs the relational recomputation pass before
//! returning, so the registry and occupancy index are always mutually
//! consistent and every piece's derived data (potentials, legals,
//! accessors, attack/defense lists, pins, shadows) reflects the board.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::geometry::{
    direction_between, file_of, intercepts, parse_square, rank_of, square_at, square_name,
    squares_between, step, Direction, DirectionGroup, Square, ALL_DIRECTIONS,
};
use crate::notation::{CastleSide, MoveRecord, BLACK_WINS, DRAWN, WHITE_WINS};
use crate::piece::{Piece, PieceId, Role, Side};

#[derive(Clone, Debug)]
pub struct GameState {
    pieces: HashMap<PieceId, Piece>,
    squares: [Option<PieceId>; 64],
    current: Side,
    en_passant: Option<Square>,
    promotion: Option<Square>,
    promotions_minted: u32,
    captures: Vec<PieceId>,
    moves: Vec<String>,
}

/// A parsed move resolved against the board: concrete squares for the
/// mover (and rook, when castling), capture and promotion phases.
#[derive(Clone, Debug)]
struct DeconMove {
    mover: PieceId,
    from: Square,
    to: Square,
    capture: bool,
    ep_victim: Option<Square>,
    castle: Option<(PieceId, Square, Square)>,
    promo_phase_one: bool,
    promoted: Option<PieceId>,
    /// Promotion phase two: destination already committed, only the
    /// piece identity changes.
    phase_two: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> GameState {
        GameState::from_positions(&GameState::initial_placements(), Side::White)
            .expect("standard placement is valid")
    }

    /// The standard opening placement, keyed by stable piece ids.
    pub fn initial_placements() -> Vec<(PieceId, Square)> {
        const PLACEMENTS: [(&str, &str); 32] = [
            ("WQR", "a1"),
            ("WQN", "b1"),
            ("WQB", "c1"),
            ("WQ", "d1"),
            ("WK", "e1"),
            ("WKB", "f1"),
            ("WKN", "g1"),
            ("WKR", "h1"),
            ("WQRP", "a2"),
            ("WQNP", "b2"),
            ("WQBP", "c2"),
            ("WQP", "d2"),
            ("WKP", "e2"),
            ("WKBP", "f2"),
            ("WKNP", "g2"),
            ("WKRP", "h2"),
            ("BQR", "a8"),
            ("BQN", "b8"),
            ("BQB", "c8"),
            ("BQ", "d8"),
            ("BK", "e8"),
            ("BKB", "f8"),
            ("BKN", "g8"),
            ("BKR", "h8"),
            ("BQRP", "a7"),
            ("BQNP", "b7"),
            ("BQBP", "c7"),
            ("BQP", "d7"),
            ("BKP", "e7"),
            ("BKBP", "f7"),
            ("BKNP", "g7"),
            ("BKRP", "h7"),
        ];
        PLACEMENTS
            .iter()
            .map(|(pid, sq)| {
                (
                    PieceId::new(pid).expect("placement table ids are valid"),
                    parse_square(sq).expect("placement table squares are valid"),
                )
            })
            .collect()
    }

    /// Builds a state from an arbitrary placement, validating the
    /// one-king-per-side and one-piece-per-square invariants up front.
    pub fn from_positions(
        placements: &[(PieceId, Square)],
        first_turn: Side,
    ) -> EngineResult<GameState> {
        let mut pieces = HashMap::new();
        let mut squares: [Option<PieceId>; 64] = std::array::from_fn(|_| None);
        for (id, sq) in placements {
            if let Some(other) = &squares[*sq as usize] {
                return Err(EngineError::Inconsistent(format!(
                    "{id} and {other} both placed on {}",
                    square_name(*sq)
                )));
            }
            if pieces.contains_key(id) {
                return Err(EngineError::Inconsistent(format!("{id} placed twice")));
            }
            squares[*sq as usize] = Some(id.clone());
            pieces.insert(id.clone(), Piece::new(id.clone(), *sq));
        }
        for side in [Side::White, Side::Black] {
            let kings = pieces.values().filter(|p| p.side == side && p.role == Role::King).count();
            if kings != 1 {
                return Err(EngineError::Inconsistent(format!(
                    "{side:?} has {kings} kings"
                )));
            }
        }
        let mut state = GameState {
            pieces,
            squares,
            current: first_turn,
            en_passant: None,
            promotion: None,
            promotions_minted: 0,
            captures: Vec::new(),
            moves: Vec::new(),
        };
        state.recompute_all();
        Ok(state)
    }

    // Queries

    pub fn side_to_move(&self) -> Side {
        self.current
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Non-empty exactly while a promotion choice is outstanding.
    pub fn promotion_pending(&self) -> Option<Square> {
        self.promotion
    }

    pub fn captures(&self) -> &[PieceId] {
        &self.captures
    }

    pub fn captures_of(&self, side: Side) -> Vec<PieceId> {
        self.captures.iter().filter(|id| id.side() == side).cloned().collect()
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn last_move(&self) -> Option<&str> {
        self.moves.last().map(String::as_str)
    }

    pub fn occupancy(&self) -> &[Option<PieceId>; 64] {
        &self.squares
    }

    pub fn piece(&self, id: &PieceId) -> EngineResult<&Piece> {
        self.pieces
            .get(id)
            .ok_or_else(|| EngineError::MissingPiece(id.to_string()))
    }

    pub fn id_at(&self, sq: Square) -> Option<&PieceId> {
        self.squares[sq as usize].as_ref()
    }

    pub fn piece_at(&self, sq: Square) -> Option<&Piece> {
        self.id_at(sq).and_then(|id| self.pieces.get(id))
    }

    pub fn square_of(&self, id: &PieceId) -> Option<Square> {
        self.pieces.get(id).and_then(|p| p.square)
    }

    /// Live piece ids of one side, sorted for deterministic iteration.
    pub fn ids_of(&self, side: Side) -> Vec<PieceId> {
        let mut ids: Vec<PieceId> =
            self.pieces.keys().filter(|id| id.side() == side).cloned().collect();
        ids.sort();
        ids
    }

    pub fn king(&self, side: Side) -> &Piece {
        self.pieces
            .get(&PieceId::king(side))
            .expect("exactly one king per side")
    }

    pub fn king_square(&self, side: Side) -> Square {
        self.king(side).square.expect("kings are never captured")
    }

    pub fn in_check(&self, side: Side) -> bool {
        !self.king(side).attacked_by.is_empty()
    }

    /// Current squares of the given pieces, for highlight sets.
    pub fn squares_of(&self, ids: &[PieceId]) -> Vec<Square> {
        ids.iter().filter_map(|id| self.square_of(id)).collect()
    }

    /// First occupied square outward from `from`, honoring the rule
    /// that half-wind directions only ever look one leap.
    pub fn first_occupant_along(&self, from: Square, drctn: Direction) -> Option<Square> {
        let mut sq = from;
        while let Some(next) = step(drctn, sq) {
            if self.squares[next as usize].is_some() {
                return Some(next);
            }
            if drctn.is_half_wind() {
                return None;
            }
            sq = next;
        }
        None
    }

    /// Every piece of `by` bearing on `target`. The defending side's
    /// king is treated as transparent: it cannot block the very ray it
    /// would be stepping away along.
    pub fn checked_by(&self, target: Square, by: Side) -> Vec<PieceId> {
        let mut checkers = Vec::new();
        for drctn in ALL_DIRECTIONS {
            if drctn.is_half_wind() {
                if let Some(sq) = step(drctn, target) {
                    if let Some(piece) = self.piece_at(sq) {
                        if piece.side == by && piece.role == Role::Knight {
                            checkers.push(piece.id.clone());
                        }
                    }
                }
                continue;
            }
            let mut first_step = true;
            let mut sq = target;
            while let Some(next) = step(drctn, sq) {
                sq = next;
                match self.piece_at(sq) {
                    Some(piece) if piece.side != by && piece.role == Role::King => {
                        first_step = false;
                        continue;
                    }
                    Some(piece) if piece.side == by => {
                        let bears = match drctn.group() {
                            DirectionGroup::Ordinal => match piece.role {
                                Role::Queen | Role::Bishop => true,
                                Role::King => first_step,
                                Role::Pawn => first_step && pawn_checks_along(by, drctn),
                                _ => false,
                            },
                            DirectionGroup::Cardinal => match piece.role {
                                Role::Queen | Role::Rook => true,
                                Role::King => first_step,
                                _ => false,
                            },
                            DirectionGroup::HalfWind => false,
                        };
                        if bears {
                            checkers.push(piece.id.clone());
                        }
                        break;
                    }
                    Some(_) => break,
                    None => first_step = false,
                }
            }
        }
        checkers
    }

    /// Submission-time re-derivation of king safety, independent of the
    /// cached legal sets: would moving `from` to `to` leave the mover's
    /// own king attacked (discovered check included)?
    pub fn self_check(&self, from: Square, to: Square) -> bool {
        let mover = match self.piece_at(from) {
            Some(p) => p,
            None => return false,
        };
        let side = mover.side;
        let king_sq = self.king_square(side);

        if mover.role == Role::King {
            if !self.checked_by(to, side.other()).is_empty() {
                return true;
            }
            if (file_of(from) - file_of(to)).abs() == 2 {
                // castling: the square passed through must be safe too
                let pass = square_at((file_of(from) + file_of(to)) / 2, rank_of(from))
                    .expect("castling stays on the back rank");
                return !self.checked_by(pass, side.other()).is_empty();
            }
            return false;
        }

        let drctn = match direction_between(king_sq, from) {
            Some(d) => d,
            None => return false,
        };
        if self.first_occupant_along(king_sq, drctn) != Some(from) {
            return false;
        }
        if let Some(revealed_sq) = self.first_occupant_along(from, drctn) {
            if let Some(revealed) = self.piece_at(revealed_sq) {
                let slides = matches!(revealed.role, Role::Queen | Role::Rook | Role::Bishop);
                if revealed.side != side && slides && revealed.directions().contains(&drctn) {
                    if mover.role == Role::Knight {
                        // a knight always leaves the line
                        return true;
                    }
                    return direction_between(king_sq, to) != Some(drctn);
                }
            }
        }
        false
    }

    /// True when moving `from` to `to` resolves any check currently on
    /// the mover's king: capture the sole checker, interpose, or step
    /// the king to an unattacked square.
    pub fn escapes_check(&self, from: Square, to: Square) -> bool {
        let mover = match self.piece_at(from) {
            Some(p) => p,
            None => return false,
        };
        let side = mover.side;
        let king = self.king(side);
        if king.attacked_by.is_empty() {
            return true;
        }
        if mover.role == Role::King {
            return self.checked_by(to, side.other()).is_empty();
        }
        let king_sq = self.king_square(side);
        king.attacked_by.iter().any(|checker| {
            self.square_of(checker)
                .map(|csq| intercepts(to, csq, king_sq))
                .unwrap_or(false)
        })
    }

    /// Only meaningful when the king is already attacked. Double check
    /// with no king move short-circuits to mate; a single checker must
    /// be uncapturable and uninterposable (legal sets are pin-filtered,
    /// so a pinned defender never refutes mate).
    pub fn is_checkmate(&self, side: Side) -> bool {
        let king = self.king(side);
        if !king.legals.is_empty() {
            return false;
        }
        let checkers = &king.attacked_by;
        if checkers.is_empty() {
            return false;
        }
        if checkers.len() >= 2 {
            return true;
        }
        let king_sq = self.king_square(side);
        let checker_sq = match self.square_of(&checkers[0]) {
            Some(sq) => sq,
            None => return false,
        };
        let line = squares_between(checker_sq, king_sq);
        for id in self.ids_of(side) {
            if id.is_king() {
                continue;
            }
            let piece = &self.pieces[&id];
            if piece.legals.contains(&checker_sq) {
                return false;
            }
            if piece.legals.iter().any(|sq| line.contains(sq)) {
                return false;
            }
        }
        true
    }

    /// Pieces of the attacked piece's side (king excluded) that can
    /// legally land between it and the attacker, with the landing
    /// square for each.
    pub fn intercept_alignment(
        &self,
        attacked: &PieceId,
        attacker_sq: Square,
    ) -> Vec<(PieceId, Square)> {
        let attacked_sq = match self.square_of(attacked) {
            Some(sq) => sq,
            None => return Vec::new(),
        };
        let betweens = squares_between(attacked_sq, attacker_sq);
        if betweens.is_empty() {
            return Vec::new();
        }
        let mut options = Vec::new();
        for id in self.ids_of(attacked.side()) {
            if id.is_king() || &id == attacked {
                continue;
            }
            let piece = &self.pieces[&id];
            for &sq in &betweens {
                if piece.legals.contains(&sq) {
                    options.push((id.clone(), sq));
                }
            }
        }
        options
    }

    /// Material rank for exchange evaluation. Pawn worth grows with
    /// advancement, symmetric across the board's midline.
    pub fn piece_worth(&self, id: &PieceId) -> i32 {
        if id.role() == Role::Pawn {
            if let Some(sq) = self.square_of(id) {
                return match id.side() {
                    Side::White => rank_of(sq) as i32 + 1,
                    Side::Black => 8 - rank_of(sq) as i32,
                };
            }
        }
        id.role().base_worth()
    }

    /// Canonical position hash for repetition detection: occupancy by
    /// side and role, side to move, castling rights, en-passant target.
    /// Piece identity is deliberately ignored so transposed same-role
    /// pieces compare equal.
    pub fn position_hash(&self) -> u64 {
        fn mix(h: u64, x: u64) -> u64 {
            (h ^ x).wrapping_mul(0x0000_0100_0000_01b3)
        }
        let mut h = 0xcbf2_9ce4_8422_2325u64;
        h = mix(
            h,
            match self.current {
                Side::White => 1,
                Side::Black => 2,
            },
        );
        let rights = [
            self.castle_right(Side::White, CastleSide::KingSide),
            self.castle_right(Side::White, CastleSide::QueenSide),
            self.castle_right(Side::Black, CastleSide::KingSide),
            self.castle_right(Side::Black, CastleSide::QueenSide),
        ];
        for (i, right) in rights.iter().enumerate() {
            h = mix(h, if *right { 3 + i as u64 } else { 13 + i as u64 });
        }
        if let Some(ep) = self.en_passant {
            h = mix(h, 29 + ep as u64);
        }
        for sq in 0..64u8 {
            let v = match self.piece_at(sq) {
                Some(p) => {
                    (sq as u64)
                        | (((p.role.idx() + 1) as u64) << 6)
                        | (((p.side.idx() + 1) as u64) << 10)
                }
                None => sq as u64,
            };
            h = mix(h, v);
        }
        h
    }

    pub fn castle_right(&self, side: Side, castle: CastleSide) -> bool {
        if self.king(side).moved {
            return false;
        }
        let tag = match (side, castle) {
            (Side::White, CastleSide::KingSide) => "WKR",
            (Side::White, CastleSide::QueenSide) => "WQR",
            (Side::Black, CastleSide::KingSide) => "BKR",
            (Side::Black, CastleSide::QueenSide) => "BQR",
        };
        let rid = PieceId::new(tag).expect("rook tags are valid ids");
        match self.pieces.get(&rid) {
            Some(rook) => !rook.moved && rook.square.is_some(),
            None => false,
        }
    }

    /// Appends the drawn-game result token to the move list.
    pub fn record_draw(&mut self) {
        self.moves.push(DRAWN.to_string());
    }

    /// Composes the notation for moving `pid` to `to` on the current
    /// board: capture and en-passant markers, castling tokens, and the
    /// phase-one promotion marker all derive from board state, so every
    /// caller (human submission or selector) shares one notation path.
    pub fn compose_move(&self, pid: &PieceId, to: Square) -> EngineResult<String> {
        let piece = self.piece(pid)?;
        let from = piece
            .square
            .ok_or_else(|| EngineError::MissingPiece(pid.to_string()))?;

        if piece.role == Role::King && (file_of(from) - file_of(to)).abs() == 2 {
            return Ok(if file_of(to) == 2 { "O-O-O" } else { "O-O" }.to_string());
        }

        let mut text = String::from(pid.as_str());
        if self.id_at(to).is_some() {
            text.push('x');
        }
        text.push_str(&square_name(to));
        if piece.role == Role::Pawn {
            let back_rank = match piece.side {
                Side::White => 7,
                Side::Black => 0,
            };
            if rank_of(to) == back_rank {
                text.push('=');
            } else if self.en_passant == Some(to)
                && file_of(to) != file_of(from)
                && self.id_at(to).is_none()
            {
                text.push_str("ep");
            }
        }
        Ok(text)
    }

    /// Completes a pending phase-one promotion entry with the promoted
    /// identity, yielding the phase-two notation.
    pub fn compose_promotion(&self, promoted: &PieceId) -> EngineResult<String> {
        match self.moves.last() {
            Some(last) if last.ends_with('=') => Ok(format!("{last}{promoted}")),
            _ => Err(EngineError::Inconsistent(
                "no phase-one promotion to complete".to_string(),
            )),
        }
    }

    /// Mints the identifier a promotion to `role` would produce next.
    pub fn next_promotion_id(&self, side: Side, role: Role) -> PieceId {
        PieceId::promoted(side, self.promotions_minted + 1, role)
    }

    // Mutation

    /// Applies one move given in internal notation. Notation is always
    /// generated internally or read from trusted fixtures; the legality
    /// gate lives at the square-submission boundary, not here.
    ///
    /// Returns the recorded notation, with the check/mate suffix
    /// appended when the move delivers one.
    pub fn process_move(&mut self, notation: &str) -> EngineResult<String> {
        let record = MoveRecord::parse(notation)?;
        if record.promo_phase_one && record.promoted.is_some() {
            if let (Some(mover), Some(to)) = (&record.mover, record.to) {
                if self.square_of(mover) != Some(to) {
                    // a complete promotion replayed as one string runs
                    // its destination phase first
                    let mut phase_one = record.clone();
                    phase_one.promoted = None;
                    phase_one.suffix = None;
                    self.apply(&phase_one, &phase_one.format())?;
                }
            }
        }
        self.apply(&record, notation)
    }

    fn apply(&mut self, record: &MoveRecord, notation: &str) -> EngineResult<String> {
        let decon = self.deconstruct(record)?;
        let mover_side = decon.mover.side();
        if mover_side != self.current {
            return Err(EngineError::IllegalMove {
                pid: decon.mover.to_string(),
                to: square_name(decon.to),
            });
        }
        let mut touched = vec![decon.from, decon.to];
        let was_check = self.in_check(Side::White) || self.in_check(Side::Black);
        // A lapsing en-passant window retracts legals from pawns the
        // move itself never touches
        let had_en_passant = self.en_passant.is_some();

        if decon.phase_two {
            let promoted_id = decon.promoted.clone().expect("phase two carries the new id");
            self.pieces.remove(&decon.mover).ok_or_else(|| {
                EngineError::MissingPiece(decon.mover.to_string())
            })?;
            self.pieces
                .insert(promoted_id.clone(), Piece::new(promoted_id, decon.to));
            self.promotions_minted += 1;
            self.promotion = None;
        } else {
            self.en_passant = None;
            if decon.capture && decon.ep_victim.is_none() {
                self.capture_on(decon.to, &mut touched)?;
            }
            if let Some(victim) = decon.ep_victim {
                self.capture_on(victim, &mut touched)?;
            }
            self.relocate(&decon.mover, decon.to)?;
            self.post_move_hook(&decon.mover, decon.from, decon.to);
            if let Some((rid, rfrom, rto)) = &decon.castle {
                self.relocate(rid, *rto)?;
                self.pieces.get_mut(rid).expect("rook relocated above").moved = true;
                touched.push(*rfrom);
                touched.push(*rto);
            }
        }

        self.rebuild_occupancy()?;
        let structural = decon.capture
            || decon.ep_victim.is_some()
            || decon.phase_two
            || was_check
            || had_en_passant;
        if structural {
            self.recompute_all();
        } else {
            let affected = self.affected_by(&touched);
            self.recompute(affected);
            // A fresh check restricts every legal set of the checked
            // side, not just the scanned neighborhood
            if self.in_check(Side::White) || self.in_check(Side::Black) {
                self.recompute_all();
            }
        }

        let mut recorded = notation.to_string();
        let phase_one = decon.promo_phase_one && decon.promoted.is_none();
        if !phase_one {
            let opp = mover_side.other();
            if record.suffix.is_none() && self.in_check(opp) {
                recorded.push(if self.is_checkmate(opp) { '#' } else { '+' });
            }
            self.current = opp;
        }

        let replaces_phase_one =
            decon.phase_two && matches!(self.moves.last(), Some(last) if last.ends_with('='));
        if replaces_phase_one {
            *self.moves.last_mut().expect("phase one entry present") = recorded.clone();
        } else {
            self.moves.push(recorded.clone());
        }
        if recorded.ends_with('#') {
            self.moves.push(
                match mover_side {
                    Side::White => WHITE_WINS,
                    Side::Black => BLACK_WINS,
                }
                .to_string(),
            );
        }
        Ok(recorded)
    }

    fn deconstruct(&self, record: &MoveRecord) -> EngineResult<DeconMove> {
        if let Some(castle) = record.castle {
            let mover = PieceId::king(self.current);
            let from = self
                .square_of(&mover)
                .ok_or_else(|| EngineError::MissingPiece(mover.to_string()))?;
            let (to, rook_tag, rook_to) = match (self.current, castle) {
                (Side::White, CastleSide::KingSide) => ("g1", "WKR", "f1"),
                (Side::White, CastleSide::QueenSide) => ("c1", "WQR", "d1"),
                (Side::Black, CastleSide::KingSide) => ("g8", "BKR", "f8"),
                (Side::Black, CastleSide::QueenSide) => ("c8", "BQR", "d8"),
            };
            let rid = PieceId::new(rook_tag)?;
            let rfrom = self
                .square_of(&rid)
                .ok_or_else(|| EngineError::MissingPiece(rid.to_string()))?;
            return Ok(DeconMove {
                mover,
                from,
                to: parse_square(to).expect("castle squares are valid"),
                capture: false,
                ep_victim: None,
                castle: Some((rid, rfrom, parse_square(rook_to).expect("rook squares are valid"))),
                promo_phase_one: false,
                promoted: None,
                phase_two: false,
            });
        }

        let mover = record.mover.clone().expect("non-castling moves carry a mover");
        let from = self
            .square_of(&mover)
            .ok_or_else(|| EngineError::MissingPiece(mover.to_string()))?;
        let to = record.to.expect("non-castling moves carry a destination");
        let ep_victim = if record.en_passant {
            Some(
                square_at(file_of(to), rank_of(from))
                    .expect("en-passant victim shares the mover's rank"),
            )
        } else {
            None
        };
        let phase_two = from == to && record.promoted.is_some();
        Ok(DeconMove {
            mover,
            from,
            to,
            capture: record.capture || record.en_passant,
            ep_victim,
            castle: None,
            promo_phase_one: record.promo_phase_one,
            promoted: record.promoted.clone(),
            phase_two,
        })
    }

    fn capture_on(&mut self, sq: Square, touched: &mut Vec<Square>) -> EngineResult<()> {
        let id = self.squares[sq as usize]
            .clone()
            .ok_or_else(|| EngineError::VacantSquare(square_name(sq)))?;
        self.pieces
            .remove(&id)
            .ok_or_else(|| EngineError::MissingPiece(id.to_string()))?;
        self.squares[sq as usize] = None;
        self.captures.push(id);
        touched.push(sq);
        Ok(())
    }

    fn relocate(&mut self, id: &PieceId, to: Square) -> EngineResult<()> {
        let piece = self
            .pieces
            .get_mut(id)
            .ok_or_else(|| EngineError::MissingPiece(id.to_string()))?;
        piece.square = Some(to);
        Ok(())
    }

    fn post_move_hook(&mut self, id: &PieceId, from: Square, to: Square) {
        match id.role() {
            Role::King | Role::Rook => {
                self.pieces.get_mut(id).expect("mover is live").moved = true;
            }
            Role::Pawn => {
                self.pieces.get_mut(id).expect("mover is live").moved = true;
                let side = id.side();
                if (rank_of(to) - rank_of(from)).abs() == 2 {
                    // the square passed over becomes the en-passant target
                    let mid = square_at(file_of(from), (rank_of(from) + rank_of(to)) / 2)
                        .expect("midpoint of a double advance is on the board");
                    self.en_passant = Some(mid);
                }
                let back_rank = match side {
                    Side::White => 7,
                    Side::Black => 0,
                };
                if rank_of(to) == back_rank {
                    self.promotion = Some(to);
                }
            }
            _ => {}
        }
    }

    fn rebuild_occupancy(&mut self) -> EngineResult<()> {
        let mut squares: [Option<PieceId>; 64] = std::array::from_fn(|_| None);
        for (id, piece) in &self.pieces {
            if let Some(sq) = piece.square {
                if let Some(other) = &squares[sq as usize] {
                    return Err(EngineError::Inconsistent(format!(
                        "{id} and {other} both occupy {}",
                        square_name(sq)
                    )));
                }
                squares[sq as usize] = Some(id.clone());
            }
        }
        self.squares = squares;
        Ok(())
    }

    /// Pieces whose relational data a move can change: the occupants of
    /// the touched squares plus every piece visible along any direction
    /// from them. Both kings are always included (pins, shadows, check
    /// state).
    fn affected_by(&self, touched: &[Square]) -> Vec<PieceId> {
        let mut ids: Vec<PieceId> = Vec::new();
        let mut note = |id: &PieceId, ids: &mut Vec<PieceId>| {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        };
        for &sq in touched {
            if let Some(id) = self.id_at(sq) {
                note(id, &mut ids);
            }
            for drctn in ALL_DIRECTIONS {
                let mut cur = sq;
                while let Some(next) = step(drctn, cur) {
                    cur = next;
                    if let Some(id) = self.id_at(cur) {
                        note(id, &mut ids);
                    }
                    if drctn.is_half_wind() {
                        break;
                    }
                }
            }
        }
        ids
    }

    // Recomputation pass

    pub(crate) fn recompute_all(&mut self) {
        let ids: Vec<PieceId> = self.pieces.keys().cloned().collect();
        self.recompute(ids);
    }

    fn recompute(&mut self, mut affected: Vec<PieceId>) {
        affected.retain(|id| self.pieces.contains_key(id));
        for side in [Side::White, Side::Black] {
            let kid = PieceId::king(side);
            if !affected.contains(&kid) {
                affected.push(kid);
            }
        }
        affected.sort();
        affected.dedup();

        // Phase 1: geometric scan and relation lists
        for id in &affected {
            let scan = self.scan_piece(id);
            let piece = self.pieces.get_mut(id).expect("affected ids are live");
            piece.accessors = scan.accessors;
            piece.potentials = scan.potentials;
            piece.attacking = scan.attacking;
            piece.attacked_by = scan.attacked_by;
            piece.defending = scan.defending;
            piece.defended_by = scan.defended_by;
            piece.kpin = None;
            piece.kshadow = None;
            piece.legals.clear();
        }

        // Phase 2: pins and shadows, marked by each king along its rays
        let mut marked = Vec::new();
        for side in [Side::White, Side::Black] {
            marked.extend(self.mark_pins(side));
            marked.extend(self.mark_shadows(side));
        }
        for id in marked {
            if !affected.contains(&id) {
                affected.push(id);
            }
        }

        // Phase 3: legality (kings last: castling consults rook data)
        affected.sort_by_key(|id| id.is_king());
        for id in &affected {
            if id.is_king() {
                let (castles, legals) = self.king_moves(id);
                let piece = self.pieces.get_mut(id).expect("affected ids are live");
                piece.potentials.extend(castles);
                piece.legals = legals;
            } else {
                let legals = self.derive_legals(id);
                self.pieces.get_mut(id).expect("affected ids are live").legals = legals;
            }
        }
    }

    fn scan_piece(&self, id: &PieceId) -> ScanData {
        let mut scan = ScanData::default();
        let piece = &self.pieces[id];
        let from = match piece.square {
            Some(sq) => sq,
            None => return scan,
        };
        let capability = piece.directions();
        for drctn in ALL_DIRECTIONS {
            let mut sq = from;
            let mut step_too_far = false;
            while let Some(next) = step(drctn, sq) {
                sq = next;
                match self.piece_at(sq) {
                    Some(other) => {
                        if other.side == piece.side {
                            scan.accessors.push(sq);
                            if piece.aligned_with(sq) {
                                scan.defending.push(other.id.clone());
                            }
                            if other.aligned_with(from) {
                                scan.defended_by.push(other.id.clone());
                            }
                        } else {
                            if capability.contains(&drctn) && !step_too_far {
                                scan.potentials.push(sq);
                            }
                            if piece.aligned_with(sq) {
                                scan.attacking.push(other.id.clone());
                            }
                            if other.aligned_with(from) {
                                scan.attacked_by.push(other.id.clone());
                            }
                        }
                        break;
                    }
                    None => {
                        scan.accessors.push(sq);
                        if capability.contains(&drctn) && !step_too_far {
                            scan.potentials.push(sq);
                        }
                    }
                }
                step_too_far = piece.role.single_step();
                if drctn.is_half_wind() {
                    break;
                }
            }
        }
        scan
    }

    /// Along each of the king's rays: first own piece, then an enemy
    /// slider bearing down the same line, marks the pin. Kings block
    /// pin lines and never pin.
    fn mark_pins(&mut self, side: Side) -> Vec<PieceId> {
        let king_sq = self.king_square(side);
        let mut marked = Vec::new();
        for drctn in ALL_DIRECTIONS {
            let mut candidate: Option<PieceId> = None;
            let mut found: Option<(PieceId, Option<PieceId>)> = None;
            let mut sq = king_sq;
            while let Some(next) = step(drctn, sq) {
                sq = next;
                if let Some(piece) = self.piece_at(sq) {
                    if piece.role == Role::King {
                        break;
                    }
                    if piece.side == side {
                        if candidate.is_some() {
                            break;
                        }
                        candidate = Some(piece.id.clone());
                    } else {
                        if let Some(cand) = candidate.take() {
                            let pins = matches!(
                                piece.role,
                                Role::Queen | Role::Rook | Role::Bishop
                            ) && piece.directions().contains(&drctn);
                            found = Some((cand, pins.then(|| piece.id.clone())));
                        }
                        break;
                    }
                }
                if drctn.is_half_wind() {
                    break;
                }
            }
            if let Some((cand, pinner)) = found {
                self.pieces.get_mut(&cand).expect("candidate is live").kpin = pinner;
                marked.push(cand);
            }
        }
        marked
    }

    /// Along each of the king's rays: first an enemy piece that cannot
    /// itself bear down the line, then an enemy slider that can, marks
    /// the blocker with the covered checker. Moving the blocker
    /// uncovers a discovered check against this king.
    fn mark_shadows(&mut self, side: Side) -> Vec<PieceId> {
        let king_sq = self.king_square(side);
        let mut marked = Vec::new();
        for drctn in ALL_DIRECTIONS {
            let mut blocker: Option<PieceId> = None;
            let mut found: Option<(PieceId, PieceId)> = None;
            let mut sq = king_sq;
            while let Some(next) = step(drctn, sq) {
                sq = next;
                if let Some(piece) = self.piece_at(sq) {
                    if piece.side == side || piece.role == Role::King {
                        break;
                    }
                    let covers = matches!(piece.role, Role::Queen | Role::Rook | Role::Bishop)
                        && piece.directions().contains(&drctn);
                    match blocker.take() {
                        None => {
                            if covers {
                                // a direct checker, nothing is shadowed
                                break;
                            }
                            blocker = Some(piece.id.clone());
                        }
                        Some(b) => {
                            if covers {
                                found = Some((b, piece.id.clone()));
                            }
                            break;
                        }
                    }
                }
                if drctn.is_half_wind() {
                    break;
                }
            }
            if let Some((blocker, checker)) = found {
                self.pieces.get_mut(&blocker).expect("blocker is live").kshadow = Some(checker);
                marked.push(blocker);
            }
        }
        marked
    }

    fn derive_legals(&self, id: &PieceId) -> Vec<Square> {
        let piece = &self.pieces[id];
        if piece.square.is_none() {
            return Vec::new();
        }
        let mut legals = match piece.role {
            Role::Pawn => self.pawn_legals(piece),
            _ => piece.potentials.clone(),
        };
        legals.retain(|&to| !piece.is_pinned(to, self));

        // While the own king is checked, the only non-king moves are
        // capturing the sole checker or interposing on its line.
        let king = self.king(piece.side);
        if !king.attacked_by.is_empty() {
            if king.attacked_by.len() > 1 {
                legals.clear();
            } else {
                let king_sq = king.square.expect("kings are never captured");
                let checker_sq = self.square_of(&king.attacked_by[0]);
                legals.retain(|&to| {
                    matches!(checker_sq, Some(csq) if intercepts(to, csq, king_sq))
                });
            }
        }
        legals
    }

    fn pawn_legals(&self, piece: &Piece) -> Vec<Square> {
        let from = piece.square.expect("pawn legality needs a square");
        let mut legals = Vec::new();
        for &to in &piece.potentials {
            let ahead = file_of(to) == file_of(from);
            if ahead {
                // forward squares never capture and block on anyone
                if self.id_at(to).is_some() {
                    continue;
                }
                legals.push(to);
                let (start_rank, delta) = match piece.side {
                    Side::White => (1, 2),
                    Side::Black => (6, -2),
                };
                if rank_of(from) == start_rank {
                    let two = square_at(file_of(from), rank_of(from) + delta)
                        .expect("double advance from the start rank is on the board");
                    if self.id_at(two).is_none() {
                        legals.push(two);
                    }
                }
            } else if self.id_at(to).is_some() {
                legals.push(to);
            } else if self.en_passant == Some(to) {
                legals.push(to);
            }
        }
        legals
    }

    fn king_moves(&self, id: &PieceId) -> (Vec<Square>, Vec<Square>) {
        let king = &self.pieces[id];
        let ksq = match king.square {
            Some(sq) => sq,
            None => return (Vec::new(), Vec::new()),
        };
        let opp = king.side.other();
        let castles = self.castle_candidates(king);
        let mut legals = Vec::new();
        for &to in king.potentials.iter().chain(castles.iter()) {
            if !self.checked_by(to, opp).is_empty() {
                continue;
            }
            if (file_of(to) - file_of(ksq)).abs() == 2 {
                // castling may not pass through an attacked square
                let pass = square_at((file_of(to) + file_of(ksq)) / 2, rank_of(ksq))
                    .expect("castling stays on the back rank");
                if !self.checked_by(pass, opp).is_empty() {
                    continue;
                }
            }
            legals.push(to);
        }
        (castles, legals)
    }

    /// Castling destinations become king potentials only while the king
    /// is unmoved and unchecked and the rook is unmoved and currently
    /// defends the king's square (the between-squares-empty proxy).
    fn castle_candidates(&self, king: &Piece) -> Vec<Square> {
        let mut squares = Vec::new();
        if king.moved || !king.attacked_by.is_empty() {
            return squares;
        }
        let (tags, dests): ([&str; 2], [&str; 2]) = match king.side {
            Side::White => (["WKR", "WQR"], ["g1", "c1"]),
            Side::Black => (["BKR", "BQR"], ["g8", "c8"]),
        };
        for (tag, dest) in tags.iter().zip(dests.iter()) {
            let rid = PieceId::new(tag).expect("rook tags are valid ids");
            if let Some(rook) = self.pieces.get(&rid) {
                if !rook.moved && rook.defending.contains(&king.id) {
                    squares.push(parse_square(dest).expect("castle squares are valid"));
                }
            }
        }
        squares
    }
}

#[derive(Default)]
struct ScanData {
    accessors: Vec<Square>,
    potentials: Vec<Square>,
    attacking: Vec<PieceId>,
    attacked_by: Vec<PieceId>,
    defending: Vec<PieceId>,
    defended_by: Vec<PieceId>,
}

fn pawn_checks_along(by: Side, drctn: Direction) -> bool {
    // Scanning outward from the target: a white pawn met to the
    // south-east or south-west attacks it, mirrored for black.
    match by {
        Side::White => matches!(drctn, Direction::SE | Direction::SW),
        Side::Black => matches!(drctn, Direction::NE | Direction::NW),
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
