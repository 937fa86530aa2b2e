//! Query filters for board live queries.
//!
//! A filter is data: the store core builds filters and hands them to the
//! live-query backend, which interprets them however its wire protocol
//! requires. `matches` is the reference semantics that in-process backends
//! (and the testkit) evaluate directly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::board::{Board, BoardRole};
use crate::identifiers::{Email, PrincipalId};

/// An explicit, unescaped key addressing one entry of the role-grants map.
///
/// Role grants are keyed by email address. Emails contain `.`, which
/// collides with dotted field-path syntax in most query languages, so the
/// key is carried as a literal string and backends must address the map
/// entry directly instead of parsing a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapKey(String);

impl MapKey {
    /// Address the role-grant entry for the given email.
    pub fn role_entry(email: &Email) -> Self {
        Self(email.as_str().to_string())
    }

    /// The literal key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key as an email address.
    pub fn to_email(&self) -> Email {
        Email::new(self.0.clone())
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "roles[{}]", self.0)
    }
}

/// Predicate selecting the boards one live query covers.
///
/// The four access paths of the permission model map onto exactly two
/// filter shapes: one on the owner field and one per role value on the
/// grants map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardFilter {
    /// Boards owned by the principal.
    OwnerIs(PrincipalId),
    /// Boards whose grants map holds `role` under the literal `key`.
    RoleIs {
        /// Map-entry address (the principal's email, unescaped).
        key: MapKey,
        /// Required role value.
        role: BoardRole,
    },
}

impl BoardFilter {
    /// Filter for boards owned by `owner`.
    pub fn owned_by(owner: PrincipalId) -> Self {
        Self::OwnerIs(owner)
    }

    /// Filter for boards granting `role` to `email`.
    pub fn role_granted(email: &Email, role: BoardRole) -> Self {
        Self::RoleIs {
            key: MapKey::role_entry(email),
            role,
        }
    }

    /// Reference semantics: does this filter select the given board?
    pub fn matches(&self, board: &Board) -> bool {
        match self {
            Self::OwnerIs(owner) => board.owner == *owner,
            Self::RoleIs { key, role } => board.role_for(&key.to_email()) == Some(*role),
        }
    }
}

impl fmt::Display for BoardFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OwnerIs(owner) => write!(f, "owner == {owner}"),
            Self::RoleIs { key, role } => write!(f, "{key} == {role}"),
        }
    }
}
