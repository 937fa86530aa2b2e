//! The entity mutation endpoint.

use async_trait::async_trait;
use std::sync::Arc;

use crate::board::Board;
use crate::errors::MutationError;
use crate::idea::Idea;
use crate::identifiers::{BoardId, IdeaId};

/// Remote CRUD for boards and ideas.
///
/// Mutations are fire-and-confirm: a successful call means the remote
/// store accepted the change, and the change becomes visible locally only
/// when it flows back through a live query. The store core never retries
/// a failed mutation.
#[async_trait]
pub trait BoardMutationEffects: Send + Sync {
    /// Create a board owned by the calling principal. The remote store
    /// assigns the id and returns the created snapshot.
    async fn create_board(&self, name: &str) -> Result<Board, MutationError>;

    /// Delete a board and everything in it.
    async fn delete_board(&self, id: BoardId) -> Result<(), MutationError>;

    /// Create an idea on a board.
    async fn create_idea(&self, idea: Idea) -> Result<Idea, MutationError>;

    /// Delete an idea.
    async fn delete_idea(&self, id: IdeaId) -> Result<(), MutationError>;
}

#[async_trait]
impl<T: BoardMutationEffects + ?Sized> BoardMutationEffects for Arc<T> {
    async fn create_board(&self, name: &str) -> Result<Board, MutationError> {
        (**self).create_board(name).await
    }

    async fn delete_board(&self, id: BoardId) -> Result<(), MutationError> {
        (**self).delete_board(id).await
    }

    async fn create_idea(&self, idea: Idea) -> Result<Idea, MutationError> {
        (**self).create_idea(idea).await
    }

    async fn delete_idea(&self, id: IdeaId) -> Result<(), MutationError> {
        (**self).delete_idea(id).await
    }
}
