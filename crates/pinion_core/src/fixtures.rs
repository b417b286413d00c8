//! Scenario fixtures: a named move list replayed end-to-end, then one
//! piece's relational data compared against a hand-computed snapshot.
//!
//! The `"compute"` token requests an engine-generated move; replaying
//! it needs a selector, so runners that support it supply one and the
//! plain runner here rejects it.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::geometry::{parse_square, square_name, Square};
use crate::piece::{PieceId, Side};
use crate::state::GameState;

pub const COMPUTE_TOKEN: &str = "compute";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub first_turn: String,
    /// Custom placement (`pid -> square`); standard opening if absent.
    #[serde(default)]
    pub placements: Option<Vec<(String, String)>>,
    pub moves: Vec<String>,
    /// The piece whose relational data the snapshot describes.
    pub subject: String,
    pub expect: RelationalSnapshot,
}

/// Expected terminal relational data, as square/id name lists. Absent
/// fields are not checked.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RelationalSnapshot {
    #[serde(default)]
    pub legals: Option<Vec<String>>,
    #[serde(default)]
    pub potentials: Option<Vec<String>>,
    #[serde(default)]
    pub accessors: Option<Vec<String>>,
    #[serde(default)]
    pub attacking: Option<Vec<String>>,
    #[serde(default)]
    pub attacked_by: Option<Vec<String>>,
    #[serde(default)]
    pub defending: Option<Vec<String>>,
    #[serde(default)]
    pub defended_by: Option<Vec<String>>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Scenario, String> {
        serde_json::from_str(text).map_err(|e| format!("bad scenario fixture: {e}"))
    }

    pub fn first_turn(&self) -> EngineResult<Side> {
        self.first_turn
            .chars()
            .next()
            .and_then(Side::from_letter)
            .ok_or_else(|| EngineError::Inconsistent(format!("bad first turn {:?}", self.first_turn)))
    }

    /// Builds the scenario's starting state.
    pub fn starting_state(&self) -> EngineResult<GameState> {
        let first_turn = self.first_turn()?;
        match &self.placements {
            None => GameState::from_positions(&GameState::initial_placements(), first_turn),
            Some(placements) => {
                let mut resolved: Vec<(PieceId, Square)> = Vec::new();
                for (id, at) in placements {
                    let pid = PieceId::new(id)?;
                    let sq = parse_square(at).ok_or_else(|| {
                        EngineError::Inconsistent(format!("bad square {at:?} in fixture"))
                    })?;
                    resolved.push((pid, sq));
                }
                GameState::from_positions(&resolved, first_turn)
            }
        }
    }

    /// Replays every move in order. Scenarios containing the
    /// `"compute"` token need a selector-aware runner.
    pub fn replay(&self) -> EngineResult<GameState> {
        let mut state = self.starting_state()?;
        for mv in &self.moves {
            if mv == COMPUTE_TOKEN {
                return Err(EngineError::Inconsistent(
                    "scenario requests a computed move; use a selector-aware runner".to_string(),
                ));
            }
            state.process_move(mv)?;
        }
        Ok(state)
    }

    /// Compares the subject piece's relational data against the
    /// snapshot. Returns every mismatch, empty on success.
    pub fn verify(&self, state: &GameState) -> EngineResult<Vec<String>> {
        let subject = PieceId::new(&self.subject)?;
        let piece = state.piece(&subject)?;
        let mut mismatches = Vec::new();

        let mut check_squares = |field: &str, actual: &[Square], expected: &Option<Vec<String>>| {
            if let Some(expected) = expected {
                let mut actual: Vec<String> = actual.iter().map(|&s| square_name(s)).collect();
                let mut expected = expected.clone();
                actual.sort();
                expected.sort();
                if actual != expected {
                    mismatches.push(format!("{field}: expected {expected:?}, got {actual:?}"));
                }
            }
        };
        check_squares("legals", &piece.legals, &self.expect.legals);
        check_squares("potentials", &piece.potentials, &self.expect.potentials);
        check_squares("accessors", &piece.accessors, &self.expect.accessors);

        let mut check_ids = |field: &str, actual: &[PieceId], expected: &Option<Vec<String>>| {
            if let Some(expected) = expected {
                let mut actual: Vec<String> = actual.iter().map(|id| id.to_string()).collect();
                let mut expected = expected.clone();
                actual.sort();
                expected.sort();
                if actual != expected {
                    mismatches.push(format!("{field}: expected {expected:?}, got {actual:?}"));
                }
            }
        };
        check_ids("attacking", &piece.attacking, &self.expect.attacking);
        check_ids("attacked_by", &piece.attacked_by, &self.expect.attacked_by);
        check_ids("defending", &piece.defending, &self.expect.defending);
        check_ids("defended_by", &piece.defended_by, &self.expect.defended_by);

        Ok(mismatches)
    }
}
