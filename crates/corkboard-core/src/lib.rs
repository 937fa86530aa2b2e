//! Core domain types and effect traits for the Corkboard client core.
//!
//! This crate is pure: it defines the value types (boards, ideas,
//! principals), the query filters, the error taxonomy, and the effect
//! traits that describe the external collaborators (live queries, auth
//! state, entity mutation). The engine that consumes these lives in
//! `corkboard-store`; concrete backends live behind the effect traits.

pub mod board;
pub mod effects;
pub mod errors;
pub mod filter;
pub mod idea;
pub mod identifiers;

pub use board::{Board, BoardRole};
pub use errors::{MutationError, QueryError, StoreError};
pub use filter::{BoardFilter, MapKey};
pub use idea::{Idea, IdeaSort, SortDirection};
pub use identifiers::{BoardId, Email, IdeaId, Principal, PrincipalId};
