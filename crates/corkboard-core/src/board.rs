//! Board snapshots and role grants.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::identifiers::{BoardId, Email, Principal, PrincipalId};

/// A role granted on a board to a principal identified by email.
///
/// Ownership is not a role: the owner is recorded separately in
/// [`Board::owner`] and sees the board regardless of the grants map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardRole {
    /// Full control short of ownership transfer.
    Admin,
    /// May create and edit ideas.
    Editor,
    /// Read-only access.
    Reader,
}

impl BoardRole {
    /// All role values, in grant-strength order.
    pub const ALL: [BoardRole; 3] = [BoardRole::Admin, BoardRole::Editor, BoardRole::Reader];
}

impl fmt::Display for BoardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Editor => write!(f, "editor"),
            Self::Reader => write!(f, "reader"),
        }
    }
}

/// An immutable snapshot of a board entity.
///
/// Every remote change produces a fresh snapshot; nothing in the client
/// mutates a `Board` in place. A board is visible to a principal iff the
/// principal owns it or holds any role grant under their email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Stable identity assigned by the remote store on creation.
    pub id: BoardId,
    /// Human-readable name.
    pub name: String,
    /// Owning principal.
    pub owner: PrincipalId,
    /// Role grants keyed by literal email address.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub roles: BTreeMap<Email, BoardRole>,
}

impl Board {
    /// Create a board snapshot with no role grants.
    pub fn new(id: BoardId, name: impl Into<String>, owner: PrincipalId) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            roles: BTreeMap::new(),
        }
    }

    /// Add a role grant, builder style.
    pub fn with_role(mut self, email: impl Into<Email>, role: BoardRole) -> Self {
        self.roles.insert(email.into(), role);
        self
    }

    /// Look up the role granted to an email, if any.
    ///
    /// The email is matched as a literal map key; it is never interpreted
    /// as a path even though it contains dots.
    pub fn role_for(&self, email: &Email) -> Option<BoardRole> {
        self.roles.get(email).copied()
    }

    /// Whether this board is visible to the given principal through any
    /// access path (ownership or any role grant).
    pub fn visible_to(&self, principal: &Principal) -> bool {
        self.owner == principal.id || self.role_for(&principal.email).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(email: &str) -> Principal {
        Principal::new(PrincipalId::new(), email)
    }

    #[test]
    fn test_visibility_through_ownership() {
        let owner = principal("owner@example.com");
        let board = Board::new(BoardId::new(), "Roadmap", owner.id);
        assert!(board.visible_to(&owner));
        assert!(!board.visible_to(&principal("stranger@example.com")));
    }

    #[test]
    fn test_visibility_through_role_grant() {
        let reader = principal("a.reader@example.com");
        let board = Board::new(BoardId::new(), "Roadmap", PrincipalId::new())
            .with_role(reader.email.clone(), BoardRole::Reader);
        assert!(board.visible_to(&reader));
        assert_eq!(board.role_for(&reader.email), Some(BoardRole::Reader));
    }

    #[test]
    fn test_role_lookup_uses_literal_key() {
        // "a.b@example.com" must not collide with a nested path "a" -> "b@..".
        let board = Board::new(BoardId::new(), "Roadmap", PrincipalId::new())
            .with_role("a.b@example.com", BoardRole::Editor);
        assert_eq!(
            board.role_for(&Email::new("a.b@example.com")),
            Some(BoardRole::Editor)
        );
        assert_eq!(board.role_for(&Email::new("a")), None);
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let board = Board::new(BoardId::new(), "Roadmap", PrincipalId::new())
            .with_role("e@example.com", BoardRole::Admin);
        let json = serde_json::to_string(&board).unwrap();
        let restored: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(board, restored);
    }
}
