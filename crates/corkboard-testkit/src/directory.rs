//! A self-consistent in-memory backend.
//!
//! `InMemoryDirectory` behaves like a small remote store: it holds
//! boards and ideas, serves live queries over them, and re-notifies
//! every open subscription whenever a mutation changes the data it
//! matches. Auth state is a switch the test flips with `sign_in` /
//! `sign_out`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use corkboard_core::effects::{
    AuthStateEffects, BoardMutationEffects, LiveQuery, LiveQueryEffects, LiveQuerySender,
};
use corkboard_core::{
    Board, BoardFilter, BoardId, Idea, IdeaId, MutationError, Principal, QueryError,
};

const CHANNEL_CAPACITY: usize = 32;

/// Shared-handle fake backend implementing all three effect traits.
#[derive(Clone)]
pub struct InMemoryDirectory {
    inner: Arc<Inner>,
}

struct Inner {
    auth: watch::Sender<Option<Principal>>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    boards: Vec<Board>,
    ideas: Vec<Idea>,
    board_watchers: Vec<BoardWatcher>,
    idea_watchers: Vec<IdeaWatcher>,
    next_subscribe_error: Option<QueryError>,
    mutation_error: Option<MutationError>,
}

struct BoardWatcher {
    filter: BoardFilter,
    sender: LiveQuerySender<Board>,
}

struct IdeaWatcher {
    board_id: BoardId,
    sender: LiveQuerySender<Idea>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        let (auth, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                auth,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Flip auth state to `principal`. Open subscriptions are untouched;
    /// tearing them down is the engine's job.
    pub fn sign_in(&self, principal: Principal) {
        debug!(principal = %principal.id, "sign in");
        self.inner.auth.send_replace(Some(principal));
    }

    pub fn sign_out(&self) {
        debug!("sign out");
        self.inner.auth.send_replace(None);
    }

    /// Insert a board directly, as if another client created it.
    pub fn insert_board(&self, board: Board) {
        let mut state = self.inner.state.lock();
        state.boards.retain(|b| b.id != board.id);
        state.boards.push(board);
        Self::notify_boards(&mut state);
    }

    /// Remove a board (and its ideas) directly.
    pub fn remove_board(&self, id: BoardId) {
        let mut state = self.inner.state.lock();
        state.boards.retain(|b| b.id != id);
        state.ideas.retain(|i| i.board_id != id);
        Self::notify_boards(&mut state);
        Self::notify_ideas(&mut state);
    }

    /// Insert an idea directly, as if another client created it.
    pub fn insert_idea(&self, idea: Idea) {
        let mut state = self.inner.state.lock();
        state.ideas.retain(|i| i.id != idea.id);
        state.ideas.push(idea);
        Self::notify_ideas(&mut state);
    }

    /// Make the next `subscribe_*` call fail with `error`.
    pub fn fail_next_subscribe(&self, error: QueryError) {
        self.inner.state.lock().next_subscribe_error = Some(error);
    }

    /// Make every mutation fail with `error` until cleared with `None`.
    pub fn set_mutation_error(&self, error: Option<MutationError>) {
        self.inner.state.lock().mutation_error = error;
    }

    /// Board subscriptions still being served (cancelled ones are dropped
    /// on the next notification sweep, so call after a mutation).
    pub fn board_watcher_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .board_watchers
            .iter()
            .filter(|w| !w.sender.is_cancelled())
            .count()
    }

    fn notify_boards(state: &mut State) {
        let State {
            boards,
            board_watchers,
            ..
        } = state;
        board_watchers.retain(|watcher| {
            let snapshot: Vec<Board> = boards
                .iter()
                .filter(|b| watcher.filter.matches(b))
                .cloned()
                .collect();
            watcher.sender.try_send(snapshot)
        });
    }

    fn notify_ideas(state: &mut State) {
        let State {
            ideas,
            idea_watchers,
            ..
        } = state;
        idea_watchers.retain(|watcher| {
            let snapshot: Vec<Idea> = ideas
                .iter()
                .filter(|i| i.board_id == watcher.board_id)
                .cloned()
                .collect();
            watcher.sender.try_send(snapshot)
        });
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStateEffects for InMemoryDirectory {
    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.inner.auth.subscribe()
    }
}

#[async_trait]
impl LiveQueryEffects for InMemoryDirectory {
    async fn subscribe_boards(&self, filter: BoardFilter) -> Result<LiveQuery<Board>, QueryError> {
        let mut state = self.inner.state.lock();
        if let Some(error) = state.next_subscribe_error.take() {
            return Err(error);
        }
        let (sender, query) = LiveQuery::channel(CHANNEL_CAPACITY);
        let snapshot: Vec<Board> = state
            .boards
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        // Initial emission on establishment, before any change arrives.
        sender.try_send(snapshot);
        state.board_watchers.push(BoardWatcher { filter, sender });
        Ok(query)
    }

    async fn subscribe_ideas(&self, board_id: BoardId) -> Result<LiveQuery<Idea>, QueryError> {
        let mut state = self.inner.state.lock();
        if let Some(error) = state.next_subscribe_error.take() {
            return Err(error);
        }
        let (sender, query) = LiveQuery::channel(CHANNEL_CAPACITY);
        let snapshot: Vec<Idea> = state
            .ideas
            .iter()
            .filter(|i| i.board_id == board_id)
            .cloned()
            .collect();
        sender.try_send(snapshot);
        state.idea_watchers.push(IdeaWatcher { board_id, sender });
        Ok(query)
    }
}

#[async_trait]
impl BoardMutationEffects for InMemoryDirectory {
    async fn create_board(&self, name: &str) -> Result<Board, MutationError> {
        let owner = self
            .inner
            .auth
            .borrow()
            .clone()
            .ok_or_else(|| MutationError::permission_denied("not signed in"))?;
        let mut state = self.inner.state.lock();
        if let Some(error) = state.mutation_error.clone() {
            return Err(error);
        }
        let board = Board::new(BoardId::new(), name, owner.id);
        state.boards.push(board.clone());
        Self::notify_boards(&mut state);
        Ok(board)
    }

    async fn delete_board(&self, id: BoardId) -> Result<(), MutationError> {
        let mut state = self.inner.state.lock();
        if let Some(error) = state.mutation_error.clone() {
            return Err(error);
        }
        if !state.boards.iter().any(|b| b.id == id) {
            return Err(MutationError::target_missing(id));
        }
        state.boards.retain(|b| b.id != id);
        state.ideas.retain(|i| i.board_id != id);
        Self::notify_boards(&mut state);
        Self::notify_ideas(&mut state);
        Ok(())
    }

    async fn create_idea(&self, idea: Idea) -> Result<Idea, MutationError> {
        let mut state = self.inner.state.lock();
        if let Some(error) = state.mutation_error.clone() {
            return Err(error);
        }
        if !state.boards.iter().any(|b| b.id == idea.board_id) {
            return Err(MutationError::target_missing(idea.board_id));
        }
        state.ideas.push(idea.clone());
        Self::notify_ideas(&mut state);
        Ok(idea)
    }

    async fn delete_idea(&self, id: IdeaId) -> Result<(), MutationError> {
        let mut state = self.inner.state.lock();
        if let Some(error) = state.mutation_error.clone() {
            return Err(error);
        }
        if !state.ideas.iter().any(|i| i.id == id) {
            return Err(MutationError::target_missing(id));
        }
        state.ideas.retain(|i| i.id != id);
        Self::notify_ideas(&mut state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use corkboard_core::BoardRole;

    #[tokio::test]
    async fn test_initial_emission_reflects_existing_boards() {
        let dir = InMemoryDirectory::new();
        let owner = fixtures::principal("ada@example.com");
        dir.insert_board(fixtures::board("launch plan", &owner));

        let mut query = dir
            .subscribe_boards(BoardFilter::owned_by(owner.id))
            .await
            .unwrap();
        let first = query.recv().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "launch plan");
    }

    #[tokio::test]
    async fn test_mutation_renotifies_matching_subscription() {
        let dir = InMemoryDirectory::new();
        let owner = fixtures::principal("ada@example.com");
        dir.sign_in(owner.clone());

        let mut query = dir
            .subscribe_boards(BoardFilter::owned_by(owner.id))
            .await
            .unwrap();
        assert!(query.recv().await.unwrap().unwrap().is_empty());

        let created = dir.create_board("ship it").await.unwrap();
        let next = query.recv().await.unwrap().unwrap();
        assert_eq!(next, vec![created]);
    }

    #[tokio::test]
    async fn test_role_filter_matches_dotted_email_literally() {
        let dir = InMemoryDirectory::new();
        let owner = fixtures::principal("ada@example.com");
        let grantee = fixtures::principal("g.race@navy.mil");
        dir.insert_board(fixtures::shared_board(
            "shared",
            &owner,
            &grantee,
            BoardRole::Editor,
        ));

        let mut query = dir
            .subscribe_boards(BoardFilter::role_granted(&grantee.email, BoardRole::Editor))
            .await
            .unwrap();
        let boards = query.recv().await.unwrap().unwrap();
        assert_eq!(boards.len(), 1);

        // A different role under the same email does not match.
        let mut other = dir
            .subscribe_boards(BoardFilter::role_granted(&grantee.email, BoardRole::Reader))
            .await
            .unwrap();
        assert!(other.recv().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_watcher_dropped_on_next_sweep() {
        let dir = InMemoryDirectory::new();
        let owner = fixtures::principal("ada@example.com");

        let query = dir
            .subscribe_boards(BoardFilter::owned_by(owner.id))
            .await
            .unwrap();
        query.cancel();
        dir.insert_board(fixtures::board("noise", &owner));
        assert_eq!(dir.board_watcher_count(), 0);
    }

    #[tokio::test]
    async fn test_idea_subscription_follows_create_and_delete() {
        let dir = InMemoryDirectory::new();
        let owner = fixtures::principal("ada@example.com");
        dir.sign_in(owner.clone());
        let board = fixtures::board("launch plan", &owner);
        dir.insert_board(board.clone());

        let mut query = dir.subscribe_ideas(board.id).await.unwrap();
        assert!(query.recv().await.unwrap().unwrap().is_empty());

        let created = dir
            .create_idea(fixtures::idea(&board, "cheap win", (9, 7, 4)))
            .await
            .unwrap();
        let snapshot = query.recv().await.unwrap().unwrap();
        assert_eq!(snapshot, vec![created.clone()]);

        dir.delete_idea(created.id).await.unwrap();
        assert!(query.recv().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_idea_snapshots_are_scoped_to_their_board() {
        let dir = InMemoryDirectory::new();
        let owner = fixtures::principal("ada@example.com");
        let watched = fixtures::board("watched", &owner);
        let other = fixtures::board("other", &owner);
        dir.insert_board(watched.clone());
        dir.insert_board(other.clone());

        let mut query = dir.subscribe_ideas(watched.id).await.unwrap();
        assert!(query.recv().await.unwrap().unwrap().is_empty());

        // Another board's idea re-notifies, but the snapshot stays scoped.
        dir.insert_idea(fixtures::idea(&other, "elsewhere", (5, 5, 5)));
        assert!(query.recv().await.unwrap().unwrap().is_empty());

        let mine = fixtures::idea(&watched, "here", (5, 5, 5));
        dir.insert_idea(mine.clone());
        assert_eq!(query.recv().await.unwrap().unwrap(), vec![mine]);
    }

    #[tokio::test]
    async fn test_board_deletion_takes_its_ideas_along() {
        let dir = InMemoryDirectory::new();
        let owner = fixtures::principal("ada@example.com");
        dir.sign_in(owner.clone());
        let board = fixtures::board("doomed", &owner);
        dir.insert_board(board.clone());
        let idea = fixtures::idea(&board, "orphan", (3, 3, 3));
        dir.insert_idea(idea.clone());

        let mut query = dir.subscribe_ideas(board.id).await.unwrap();
        assert_eq!(query.recv().await.unwrap().unwrap(), vec![idea.clone()]);

        dir.delete_board(board.id).await.unwrap();
        assert!(query.recv().await.unwrap().unwrap().is_empty());
        let err = dir.delete_idea(idea.id).await.unwrap_err();
        assert!(matches!(err, MutationError::TargetMissing { .. }));
    }

    #[tokio::test]
    async fn test_create_idea_demands_an_existing_board() {
        let dir = InMemoryDirectory::new();
        let owner = fixtures::principal("ada@example.com");
        let ghost = fixtures::board("never inserted", &owner);

        let err = dir
            .create_idea(fixtures::idea(&ghost, "floating", (1, 1, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::TargetMissing { .. }));
    }

    #[tokio::test]
    async fn test_injected_subscribe_failure_is_one_shot() {
        let dir = InMemoryDirectory::new();
        let owner = fixtures::principal("ada@example.com");
        dir.fail_next_subscribe(QueryError::subscribe_failed("index missing"));

        let err = dir
            .subscribe_boards(BoardFilter::owned_by(owner.id))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::SubscribeFailed { .. }));
        assert!(dir
            .subscribe_boards(BoardFilter::owned_by(owner.id))
            .await
            .is_ok());
    }
}
