//! Merging the four role queries into one result set.
//!
//! Each emission carries the generation it was produced under and the
//! slot it came from. The aggregator keeps the latest emission per slot
//! for the current generation only; an emission tagged with any other
//! generation is discarded outright. Nothing merged is reported until
//! every slot has emitted at least once, so a rebuilt set never shows a
//! partial union.

use indexmap::IndexMap;
use tracing::trace;

use corkboard_core::{Board, BoardId};

use crate::query_set::RoleSlot;

/// Outcome of feeding one emission into the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The emission was tagged with a generation that is not current.
    Stale,
    /// Accepted, but at least one slot has not emitted yet.
    Pending,
    /// Accepted, and all four slots have now emitted: the merged,
    /// deduplicated result set.
    Merged(Vec<Board>),
}

/// Per-generation merge state over the four role slots.
#[derive(Debug, Default)]
pub struct StreamAggregator {
    generation: u64,
    slots: [Option<Vec<Board>>; RoleSlot::COUNT],
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The generation emissions must carry to be accepted.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new generation: all slot state is forgotten and the new
    /// generation number is returned. Emissions tagged with any earlier
    /// generation are stale from here on.
    pub fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.slots = Default::default();
        self.generation
    }

    /// Whether every slot has emitted under the current generation.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Feed one emission. Replaces the slot's previous result set, then
    /// merges across slots once all four have reported.
    pub fn observe(&mut self, generation: u64, slot: RoleSlot, boards: Vec<Board>) -> Observation {
        if generation != self.generation {
            trace!(
                emission = generation,
                current = self.generation,
                %slot,
                "discarding stale emission"
            );
            return Observation::Stale;
        }
        self.slots[slot.index()] = Some(boards);
        if self.is_complete() {
            Observation::Merged(self.merge())
        } else {
            Observation::Pending
        }
    }

    /// Union of the four slots, deduplicated by board id.
    ///
    /// Iteration follows slot order (owned, admin, editor, reader) and
    /// within a slot the backend's emission order; the first occurrence
    /// of an id wins and pins its position. The result is therefore
    /// stable across re-merges as long as the underlying emissions are.
    fn merge(&self) -> Vec<Board> {
        let mut merged: IndexMap<BoardId, Board> = IndexMap::new();
        for slot in self.slots.iter().flatten() {
            for board in slot {
                merged.entry(board.id).or_insert_with(|| board.clone());
            }
        }
        merged.into_values().collect()
    }
}
