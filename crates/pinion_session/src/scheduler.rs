//! Deferred computer-move scheduling. The selector's "thinking" is a
//! scheduled task on the single-threaded runtime, purely for pacing;
//! the session owns the handle so a pause or new-game request can
//! abort a pending computation before it fires.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use heuristic_engine::MoveSelector;
use pinion_core::state::GameState;
use pinion_core::{GeneratedMove, Selector};

pub struct PendingMove {
    handle: JoinHandle<Option<GeneratedMove>>,
}

impl PendingMove {
    /// Cancels the scheduled computation; a fired move is discarded.
    pub fn abort(&self) {
        debug!("aborting scheduled computer move");
        self.handle.abort();
    }

    /// Waits the move out. `None` when the selector has nothing to
    /// play or the task was aborted.
    pub async fn outcome(self) -> Option<GeneratedMove> {
        self.handle.await.ok().flatten()
    }
}

/// Schedules the opponent's move against a snapshot of the current
/// position. The prior move's state update has already settled by the
/// time this is called, so nothing runs concurrently with a mutation.
pub fn schedule_computed_move(state: &GameState, delay: Duration) -> PendingMove {
    let state = state.clone();
    let last: Option<String> = state.last_move().map(String::from);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut selector = MoveSelector::new();
        selector.select(&state, last.as_deref())
    });
    PendingMove { handle }
}
