//! Active-board selection over the merged result set.
//!
//! Selection is a plain state machine owned by the engine. It never
//! holds a board value, only an id, and it is reconciled against every
//! merged set so the active id always points into the boards the
//! principal can currently see.

use tracing::debug;

use corkboard_core::{Board, BoardId, StoreError};

/// Tracks which board, if any, is active.
#[derive(Debug, Default)]
pub struct SelectionManager {
    active: Option<BoardId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<BoardId> {
        self.active
    }

    /// Select `target`, or clear the selection when `target` is `None`.
    ///
    /// A `Some` target must be present in `boards`; selecting an id the
    /// principal cannot currently see is a caller error and leaves the
    /// previous selection in place.
    pub fn select(&mut self, target: Option<BoardId>, boards: &[Board]) -> Result<(), StoreError> {
        match target {
            None => {
                self.active = None;
                Ok(())
            }
            Some(id) => {
                if boards.iter().any(|b| b.id == id) {
                    self.active = Some(id);
                    Ok(())
                } else {
                    Err(StoreError::board_not_found(id))
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    /// Re-anchor the selection against a republished merged set. An
    /// active board still present is kept; otherwise the first board of
    /// the set becomes active, or none when the set is empty. Called on
    /// every merge, so a board revoked or deleted remotely hands the
    /// selection to its neighbour.
    pub fn reconcile(&mut self, boards: &[Board]) {
        match self.active {
            Some(active) if boards.iter().any(|b| b.id == active) => {}
            previous => {
                self.active = boards.first().map(|b| b.id);
                if previous != self.active {
                    debug!(from = ?previous, to = ?self.active, "selection re-anchored");
                }
            }
        }
    }

    /// After deleting `deleted`, fall back to the first other board in
    /// `boards`, or to no selection when none remains. `boards` is the
    /// merged set from before the deletion propagated, so the fallback
    /// lands on what the user saw next to the deleted board.
    pub fn fallback_after_delete(&mut self, deleted: BoardId, boards: &[Board]) {
        self.active = boards.iter().map(|b| b.id).find(|id| *id != deleted);
        debug!(deleted = %deleted, fallback = ?self.active, "selection fell back after delete");
    }
}
