//! Identifier types and the authenticated principal.
//!
//! Entity identifiers are uuid newtypes; the remote store assigns them on
//! creation and they are stable for the lifetime of the entity. `Email` is
//! deliberately a distinct type from `String`: it is used verbatim as a map
//! key in role grants (see `filter::MapKey`), so it must never be treated
//! as a dotted field path.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a board entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoardId(pub Uuid);

impl BoardId {
    /// Create a new random board ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BoardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "board-{}", self.0)
    }
}

impl From<Uuid> for BoardId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identifier of an idea within a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdeaId(pub Uuid);

impl IdeaId {
    /// Create a new random idea ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for IdeaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdeaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "idea-{}", self.0)
    }
}

impl From<Uuid> for IdeaId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identifier of an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    /// Create a new random principal ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "principal-{}", self.0)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// An email address, used verbatim as the key of a role grant.
///
/// Emails contain `.` and may contain other separator characters, which is
/// why role lookups address the grants map by literal key rather than by a
/// parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Wrap an email address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Email {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

impl From<String> for Email {
    fn from(address: String) -> Self {
        Self(address)
    }
}

/// The authenticated identity on whose behalf queries are scoped.
///
/// Lifecycle is owned entirely by the auth collaborator; the store core
/// only reacts to `Some(principal)` / `None` transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identity, matched against `Board::owner`.
    pub id: PrincipalId,
    /// Address under which role grants are keyed.
    pub email: Email,
    /// Display name, if the identity provider supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar URL, if the identity provider supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Principal {
    /// Create a principal with just the required fields.
    pub fn new(id: PrincipalId, email: impl Into<Email>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: None,
            avatar_url: None,
        }
    }

    /// Attach a display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Attach an avatar URL.
    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}
