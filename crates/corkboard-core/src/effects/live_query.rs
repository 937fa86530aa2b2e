//! The live-query capability and its subscription handle.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::board::Board;
use crate::errors::QueryError;
use crate::filter::BoardFilter;
use crate::idea::Idea;
use crate::identifiers::BoardId;

/// Idempotent cancellation flag shared between a subscription handle and
/// its backend.
///
/// Cancellation is eventually-effective: flipping the flag tells the
/// backend to stop, but emissions already in flight may still be
/// delivered. Consumers that need hard isolation (the aggregator) tag
/// emissions with a generation counter instead of relying on this.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Create a fresh, un-cancelled handle.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { flag: Arc::new(tx) }
    }

    /// Request cancellation. Safe to call any number of times.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Backend side: a receiver that resolves once cancellation is
    /// requested.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription to a remote query.
///
/// Every delivery is a full replacement result set for the query's
/// predicate, never a delta; the very first delivery is the initial
/// snapshot. The stream ends after a terminal `Err` or once the backend
/// observes cancellation.
#[derive(Debug)]
pub struct LiveQuery<T> {
    updates: mpsc::Receiver<Result<Vec<T>, QueryError>>,
    cancel: CancelHandle,
}

impl<T> LiveQuery<T> {
    /// Create a bounded handle/sender pair for backends to serve.
    pub fn channel(capacity: usize) -> (LiveQuerySender<T>, LiveQuery<T>) {
        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancelHandle::new();
        let sender = LiveQuerySender {
            tx,
            cancelled: cancel.subscribe(),
        };
        let query = LiveQuery {
            updates: rx,
            cancel,
        };
        (sender, query)
    }

    /// Receive the next full result set, or `None` once the subscription
    /// stream is closed.
    pub async fn recv(&mut self) -> Option<Result<Vec<T>, QueryError>> {
        self.updates.recv().await
    }

    /// Request cancellation of the underlying subscription.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Split into the update stream and the cancellation handle.
    pub fn into_parts(self) -> (mpsc::Receiver<Result<Vec<T>, QueryError>>, CancelHandle) {
        (self.updates, self.cancel)
    }
}

/// Backend side of a [`LiveQuery`].
pub struct LiveQuerySender<T> {
    tx: mpsc::Sender<Result<Vec<T>, QueryError>>,
    cancelled: watch::Receiver<bool>,
}

impl<T> LiveQuerySender<T> {
    /// Deliver a full replacement result set.
    ///
    /// Returns `false` if the handle was dropped or cancelled, in which
    /// case the backend should stop serving this subscription.
    pub async fn send(&self, items: Vec<T>) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx.send(Ok(items)).await.is_ok()
    }

    /// Deliver a full replacement result set without waiting for channel
    /// capacity. Backends driven by synchronous change callbacks use this
    /// variant; a full channel counts as a failed delivery.
    pub fn try_send(&self, items: Vec<T>) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx.try_send(Ok(items)).is_ok()
    }

    /// Deliver a terminal error and close the stream.
    pub async fn fail(self, error: QueryError) {
        let _ = self.tx.send(Err(error)).await;
    }

    /// Non-blocking variant of [`fail`](Self::fail).
    pub fn try_fail(self, error: QueryError) {
        let _ = self.tx.try_send(Err(error));
    }

    /// Whether the consumer requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves once the consumer requests cancellation.
    pub async fn cancelled(&mut self) {
        while !*self.cancelled.borrow_and_update() {
            if self.cancelled.changed().await.is_err() {
                return;
            }
        }
    }
}

/// The live-query capability consumed by the store core.
///
/// `subscribe_*` opens a subscription that asynchronously delivers the
/// full current result set on establishment and again after every
/// relevant remote change, until the handle is cancelled.
#[async_trait]
pub trait LiveQueryEffects: Send + Sync {
    /// Open a live query over boards matching `filter`.
    async fn subscribe_boards(&self, filter: BoardFilter) -> Result<LiveQuery<Board>, QueryError>;

    /// Open a live query over the ideas of one board.
    async fn subscribe_ideas(&self, board_id: BoardId) -> Result<LiveQuery<Idea>, QueryError>;
}

#[async_trait]
impl<T: LiveQueryEffects + ?Sized> LiveQueryEffects for Arc<T> {
    async fn subscribe_boards(&self, filter: BoardFilter) -> Result<LiveQuery<Board>, QueryError> {
        (**self).subscribe_boards(filter).await
    }

    async fn subscribe_ideas(&self, board_id: BoardId) -> Result<LiveQuery<Idea>, QueryError> {
        (**self).subscribe_ideas(board_id).await
    }
}
