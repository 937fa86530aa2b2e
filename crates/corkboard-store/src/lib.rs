//! The Corkboard store engine.
//!
//! A principal sees boards through four independent access grants
//! (ownership plus admin/editor/reader roles), each served by its own
//! live query. This crate merges those four streams into one
//! deduplicated, order-stable view, tracks the active selection, and
//! rebuilds everything under a fresh generation whenever the principal
//! changes:
//!
//! - [`RoleQuerySet`] holds the four queries, opened and cancelled as a
//!   unit.
//! - [`StreamAggregator`] merges per generation, with no partial publish.
//! - [`SelectionManager`] is the active-board state machine.
//! - [`BoardsStore`] is the engine task and its cloneable handle.
//!
//! Backends plug in through the effect traits in `corkboard-core`.

pub mod aggregator;
pub mod query_set;
pub mod selection;
pub mod store;

pub use aggregator::{Observation, StreamAggregator};
pub use query_set::{RoleQuerySet, RoleSlot};
pub use selection::SelectionManager;
pub use store::{BoardsStore, BoardsView, StoreConfig};
