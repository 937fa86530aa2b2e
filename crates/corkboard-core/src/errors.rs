//! Error taxonomy for the store core and its collaborators.
//!
//! Expected failures (`BoardNotFound`, `NoActiveSelection`) are caller
//! errors reported back through `Result`; they never tear anything down.
//! Query and mutation failures are surfaced verbatim and not retried by
//! the core.

use serde::{Deserialize, Serialize};

use crate::identifiers::BoardId;

/// Error type for live-query operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum QueryError {
    /// The backend refused or failed to establish the subscription.
    #[error("live query failed to establish: {reason}")]
    SubscribeFailed { reason: String },

    /// An established subscription terminated with an error.
    #[error("live query terminated: {reason}")]
    Terminated { reason: String },
}

impl QueryError {
    /// Create a subscribe-failed error.
    pub fn subscribe_failed(reason: impl Into<String>) -> Self {
        Self::SubscribeFailed {
            reason: reason.into(),
        }
    }

    /// Create a terminated error.
    pub fn terminated(reason: impl Into<String>) -> Self {
        Self::Terminated {
            reason: reason.into(),
        }
    }
}

/// Error type for remote mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum MutationError {
    /// The principal lacks permission for this mutation.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// The target entity does not exist remotely.
    #[error("entity not found: {id}")]
    TargetMissing { id: String },

    /// Transport-level failure.
    #[error("transport error: {reason}")]
    Transport { reason: String },
}

impl MutationError {
    /// Create a permission-denied error.
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// Create a target-missing error.
    pub fn target_missing(id: impl ToString) -> Self {
        Self::TargetMissing { id: id.to_string() }
    }

    /// Create a transport error.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the consumer-facing store interface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// `select` targeted an id absent from the current merged set.
    #[error("no visible board with id {id}")]
    BoardNotFound {
        /// The id that was requested.
        id: BoardId,
    },

    /// `delete_active` was called with nothing selected.
    #[error("no board is currently active")]
    NoActiveSelection,

    /// A live-query source failed; the merged set is unavailable.
    #[error("boards unavailable: {0}")]
    QueryUnavailable(#[from] QueryError),

    /// The remote mutation failed; local state was left untouched.
    #[error("mutation failed: {0}")]
    MutationFailed(#[from] MutationError),

    /// The store's engine task has shut down.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Create a board-not-found error.
    pub fn board_not_found(id: BoardId) -> Self {
        Self::BoardNotFound { id }
    }

    /// Whether the error is a recoverable caller error (the store is
    /// still fully usable).
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::BoardNotFound { .. } | Self::NoActiveSelection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let id = BoardId::new();
        let err = StoreError::board_not_found(id);
        assert!(err.to_string().contains(&id.to_string()));
        assert!(err.is_caller_error());

        let err = StoreError::from(MutationError::transport("connection reset"));
        assert!(err.to_string().contains("connection reset"));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_query_error_into_store_error() {
        let err: StoreError = QueryError::subscribe_failed("backend down").into();
        assert!(matches!(err, StoreError::QueryUnavailable(_)));
    }
}
