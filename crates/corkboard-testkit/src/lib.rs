//! Test backends for the Corkboard client core.
//!
//! Two implementations of the effect traits live here:
//!
//! - [`InMemoryDirectory`] is a self-consistent fake backend: mutations
//!   change its state and every open live query re-evaluates its filter
//!   and emits, the way a real remote store would push snapshots.
//! - [`ManualDirectory`] hands emission control to the test: each
//!   subscription is recorded in open order and the test decides when a
//!   given subscription emits, fails, or stays silent.
//!
//! Both drive the store engine through the same traits production
//! backends implement, so engine tests exercise the real wiring.

pub mod directory;
pub mod fixtures;
pub mod manual;

pub use directory::InMemoryDirectory;
pub use manual::ManualDirectory;
