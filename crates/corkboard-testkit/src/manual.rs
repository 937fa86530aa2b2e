//! A backend whose emissions are driven entirely by the test.
//!
//! `ManualDirectory` records every board subscription in open order and
//! never emits on its own. The test picks a subscription by index and
//! decides what it emits, when it fails, or whether it stays silent,
//! which makes interleavings and stale-generation races reproducible.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::sleep;

use corkboard_core::effects::{
    AuthStateEffects, BoardMutationEffects, LiveQuery, LiveQueryEffects, LiveQuerySender,
};
use corkboard_core::{
    Board, BoardFilter, BoardId, Idea, IdeaId, MutationError, Principal, QueryError,
};

const CHANNEL_CAPACITY: usize = 32;

/// Shared-handle scripted backend implementing all three effect traits.
#[derive(Clone)]
pub struct ManualDirectory {
    inner: Arc<Inner>,
}

struct Inner {
    auth: watch::Sender<Option<Principal>>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    open: Vec<OpenQuery>,
    subscribe_calls: usize,
    subscribe_failures: Vec<(usize, QueryError)>,
    mutation_error: Option<MutationError>,
    deleted_boards: Vec<BoardId>,
}

struct OpenQuery {
    filter: BoardFilter,
    sender: Option<LiveQuerySender<Board>>,
}

impl ManualDirectory {
    pub fn new() -> Self {
        let (auth, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                auth,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn sign_in(&self, principal: Principal) {
        self.inner.auth.send_replace(Some(principal));
    }

    pub fn sign_out(&self) {
        self.inner.auth.send_replace(None);
    }

    /// Board subscriptions opened so far, including cancelled ones.
    /// Indices into this history never shift.
    pub fn open_count(&self) -> usize {
        self.inner.state.lock().open.len()
    }

    /// Wait until at least `count` board subscriptions have been opened.
    pub async fn wait_for_open(&self, count: usize) {
        while self.open_count() < count {
            sleep(Duration::from_millis(2)).await;
        }
    }

    /// The filter the `index`-th subscription was opened with.
    pub fn filter_of(&self, index: usize) -> BoardFilter {
        self.inner.state.lock().open[index].filter.clone()
    }

    /// Emit a result set on the `index`-th subscription. Returns `false`
    /// if that subscription was cancelled or already failed.
    pub fn emit(&self, index: usize, boards: Vec<Board>) -> bool {
        let state = self.inner.state.lock();
        match &state.open[index].sender {
            Some(sender) => sender.try_send(boards),
            None => false,
        }
    }

    /// Terminate the `index`-th subscription with `error`.
    pub fn fail(&self, index: usize, error: QueryError) {
        let mut state = self.inner.state.lock();
        if let Some(sender) = state.open[index].sender.take() {
            sender.try_fail(error);
        }
    }

    /// Whether the consumer cancelled the `index`-th subscription.
    pub fn is_cancelled(&self, index: usize) -> bool {
        let state = self.inner.state.lock();
        match &state.open[index].sender {
            Some(sender) => sender.is_cancelled(),
            None => true,
        }
    }

    /// How many opened subscriptions the consumer has cancelled.
    pub fn cancelled_count(&self) -> usize {
        let state = self.inner.state.lock();
        state
            .open
            .iter()
            .filter(|q| match &q.sender {
                Some(sender) => sender.is_cancelled(),
                None => false,
            })
            .count()
    }

    /// Make the `nth` `subscribe_boards` call counted from now (0 being
    /// the very next one) fail with `error`.
    pub fn fail_subscribe_at(&self, nth: usize, error: QueryError) {
        let mut state = self.inner.state.lock();
        let at = state.subscribe_calls + nth;
        state.subscribe_failures.push((at, error));
    }

    /// Make every mutation fail with `error` until cleared with `None`.
    pub fn set_mutation_error(&self, error: Option<MutationError>) {
        self.inner.state.lock().mutation_error = error;
    }

    /// Board ids passed to `delete_board`, in call order.
    pub fn deleted_boards(&self) -> Vec<BoardId> {
        self.inner.state.lock().deleted_boards.clone()
    }
}

impl Default for ManualDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStateEffects for ManualDirectory {
    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.inner.auth.subscribe()
    }
}

#[async_trait]
impl LiveQueryEffects for ManualDirectory {
    async fn subscribe_boards(&self, filter: BoardFilter) -> Result<LiveQuery<Board>, QueryError> {
        let mut state = self.inner.state.lock();
        let call = state.subscribe_calls;
        state.subscribe_calls += 1;
        if let Some(position) = state.subscribe_failures.iter().position(|(at, _)| *at == call) {
            let (_, error) = state.subscribe_failures.swap_remove(position);
            return Err(error);
        }
        let (sender, query) = LiveQuery::channel(CHANNEL_CAPACITY);
        state.open.push(OpenQuery {
            filter,
            sender: Some(sender),
        });
        Ok(query)
    }

    async fn subscribe_ideas(&self, _board_id: BoardId) -> Result<LiveQuery<Idea>, QueryError> {
        // Idea queries stay silent; board orchestration tests do not
        // consume them.
        let (_sender, query) = LiveQuery::channel(CHANNEL_CAPACITY);
        Ok(query)
    }
}

#[async_trait]
impl BoardMutationEffects for ManualDirectory {
    async fn create_board(&self, name: &str) -> Result<Board, MutationError> {
        let owner = self
            .inner
            .auth
            .borrow()
            .clone()
            .ok_or_else(|| MutationError::permission_denied("not signed in"))?;
        if let Some(error) = self.inner.state.lock().mutation_error.clone() {
            return Err(error);
        }
        Ok(Board::new(BoardId::new(), name, owner.id))
    }

    async fn delete_board(&self, id: BoardId) -> Result<(), MutationError> {
        let mut state = self.inner.state.lock();
        if let Some(error) = state.mutation_error.clone() {
            return Err(error);
        }
        state.deleted_boards.push(id);
        Ok(())
    }

    async fn create_idea(&self, idea: Idea) -> Result<Idea, MutationError> {
        if let Some(error) = self.inner.state.lock().mutation_error.clone() {
            return Err(error);
        }
        Ok(idea)
    }

    async fn delete_idea(&self, _id: IdeaId) -> Result<(), MutationError> {
        if let Some(error) = self.inner.state.lock().mutation_error.clone() {
            return Err(error);
        }
        Ok(())
    }
}
