//! Effect traits describing the external collaborators.
//!
//! The store core is pure orchestration; everything that touches the
//! network or a session lives behind one of these traits:
//!
//! - [`LiveQueryEffects`] opens auto-updating queries against the
//!   remote collection store.
//! - [`AuthStateEffects`] observes the current principal.
//! - [`BoardMutationEffects`] performs entity CRUD against the remote
//!   store.
//!
//! Production backends adapt a real wire protocol; `corkboard-testkit`
//! provides in-memory implementations for tests.

mod auth;
mod live_query;
mod mutation;

pub use auth::AuthStateEffects;
pub use live_query::{CancelHandle, LiveQuery, LiveQueryEffects, LiveQuerySender};
pub use mutation::BoardMutationEffects;
