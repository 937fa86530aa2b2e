//! The auth-state notifier.

use std::sync::Arc;
use tokio::sync::watch;

use crate::identifiers::Principal;

/// Observe the current authenticated principal.
///
/// `subscribe` returns a watch receiver, which yields the current value
/// immediately and again on every sign-in/sign-out transition, matching
/// the notifier contract (registration delivers the current principal at
/// once). Session lifecycle itself belongs entirely to the implementor.
pub trait AuthStateEffects: Send + Sync {
    /// Subscribe to principal transitions.
    fn subscribe(&self) -> watch::Receiver<Option<Principal>>;

    /// The principal right now, if signed in.
    fn current_principal(&self) -> Option<Principal> {
        self.subscribe().borrow().clone()
    }
}

impl<T: AuthStateEffects + ?Sized> AuthStateEffects for Arc<T> {
    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        (**self).subscribe()
    }

    fn current_principal(&self) -> Option<Principal> {
        (**self).current_principal()
    }
}
