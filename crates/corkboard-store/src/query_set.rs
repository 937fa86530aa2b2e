//! The four role queries behind one principal's board visibility.
//!
//! A principal sees a board through exactly one of four access grants:
//! ownership, or an admin/editor/reader role keyed under their email.
//! Board-level visibility is therefore served by four independent live
//! queries, one per grant, opened and torn down together as a unit.

use tokio::sync::mpsc;
use tracing::debug;

use corkboard_core::effects::{CancelHandle, LiveQueryEffects};
use corkboard_core::{Board, BoardFilter, BoardRole, Principal, QueryError};

/// One of the four access grants a board query can serve.
///
/// Slot order is fixed and doubles as the merge precedence: when the
/// same board arrives through several grants, the earliest slot wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleSlot {
    /// `Board::owner` equals the principal's id.
    Owned,
    /// An `admin` role is keyed under the principal's email.
    Admin,
    /// An `editor` role is keyed under the principal's email.
    Editor,
    /// A `reader` role is keyed under the principal's email.
    Reader,
}

impl RoleSlot {
    pub const COUNT: usize = 4;
    pub const ALL: [RoleSlot; Self::COUNT] = [
        RoleSlot::Owned,
        RoleSlot::Admin,
        RoleSlot::Editor,
        RoleSlot::Reader,
    ];

    /// Position of this slot in [`Self::ALL`].
    pub fn index(self) -> usize {
        match self {
            RoleSlot::Owned => 0,
            RoleSlot::Admin => 1,
            RoleSlot::Editor => 2,
            RoleSlot::Reader => 3,
        }
    }

    /// The board filter this slot queries for `principal`.
    pub fn filter_for(self, principal: &Principal) -> BoardFilter {
        match self {
            RoleSlot::Owned => BoardFilter::owned_by(principal.id),
            RoleSlot::Admin => BoardFilter::role_granted(&principal.email, BoardRole::Admin),
            RoleSlot::Editor => BoardFilter::role_granted(&principal.email, BoardRole::Editor),
            RoleSlot::Reader => BoardFilter::role_granted(&principal.email, BoardRole::Reader),
        }
    }
}

impl std::fmt::Display for RoleSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RoleSlot::Owned => "owned",
            RoleSlot::Admin => "admin",
            RoleSlot::Editor => "editor",
            RoleSlot::Reader => "reader",
        };
        f.write_str(label)
    }
}

type BoardUpdates = mpsc::Receiver<Result<Vec<Board>, QueryError>>;

struct RoleEntry {
    slot: RoleSlot,
    updates: Option<BoardUpdates>,
    cancel: CancelHandle,
}

/// The four live board queries of one principal, managed as a unit.
///
/// Either all four subscriptions open or none do; on teardown all four
/// are cancelled, also as a unit. Cancellation is idempotent and happens
/// at the latest on drop, so a replaced query set never leaks a live
/// subscription.
pub struct RoleQuerySet {
    entries: Vec<RoleEntry>,
}

impl RoleQuerySet {
    /// Open all four role queries for `principal`.
    ///
    /// If any subscription fails, the ones already opened are cancelled
    /// and the error is returned; a partially live set never escapes.
    pub async fn subscribe(
        effects: &dyn LiveQueryEffects,
        principal: &Principal,
    ) -> Result<Self, QueryError> {
        let mut entries = Vec::with_capacity(RoleSlot::COUNT);
        for slot in RoleSlot::ALL {
            match effects.subscribe_boards(slot.filter_for(principal)).await {
                Ok(query) => {
                    let (updates, cancel) = query.into_parts();
                    entries.push(RoleEntry {
                        slot,
                        updates: Some(updates),
                        cancel,
                    });
                }
                Err(error) => {
                    debug!(%slot, %error, "role subscription failed, rolling back");
                    for entry in &entries {
                        entry.cancel.cancel();
                    }
                    return Err(error);
                }
            }
        }
        Ok(Self { entries })
    }

    /// Detach the update receivers for forwarding, one per slot.
    /// Cancellation authority stays with the set.
    pub fn take_receivers(&mut self) -> Vec<(RoleSlot, BoardUpdates)> {
        self.entries
            .iter_mut()
            .filter_map(|entry| entry.updates.take().map(|rx| (entry.slot, rx)))
            .collect()
    }

    /// Cancel all four subscriptions. Safe to call repeatedly.
    pub fn cancel_all(&self) {
        for entry in &self.entries {
            entry.cancel.cancel();
        }
    }
}

impl Drop for RoleQuerySet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corkboard_testkit::{fixtures, ManualDirectory};

    #[tokio::test]
    async fn test_opens_one_query_per_grant_in_slot_order() {
        let dir = ManualDirectory::new();
        let principal = fixtures::principal("ada@example.com");

        let set = RoleQuerySet::subscribe(&dir, &principal).await.unwrap();
        assert_eq!(dir.open_count(), RoleSlot::COUNT);
        for (index, slot) in RoleSlot::ALL.into_iter().enumerate() {
            assert_eq!(dir.filter_of(index), slot.filter_for(&principal));
        }
        drop(set);
    }

    #[tokio::test]
    async fn test_partial_failure_rolls_back_opened_queries() {
        let dir = ManualDirectory::new();
        let principal = fixtures::principal("ada@example.com");

        // Owned and admin slots open, the editor slot fails.
        dir.fail_subscribe_at(2, QueryError::subscribe_failed("quota"));

        let result = RoleQuerySet::subscribe(&dir, &principal).await;
        assert!(result.is_err());
        assert_eq!(dir.open_count(), 2);
        assert_eq!(dir.cancelled_count(), 2);
    }

    #[tokio::test]
    async fn test_drop_cancels_every_subscription() {
        let dir = ManualDirectory::new();
        let principal = fixtures::principal("ada@example.com");

        let set = RoleQuerySet::subscribe(&dir, &principal).await.unwrap();
        assert_eq!(dir.cancelled_count(), 0);
        drop(set);
        assert_eq!(dir.cancelled_count(), RoleSlot::COUNT);
    }

    #[tokio::test]
    async fn test_cancel_all_is_idempotent() {
        let dir = ManualDirectory::new();
        let principal = fixtures::principal("ada@example.com");

        let set = RoleQuerySet::subscribe(&dir, &principal).await.unwrap();
        set.cancel_all();
        set.cancel_all();
        assert_eq!(dir.cancelled_count(), RoleSlot::COUNT);
    }
}
