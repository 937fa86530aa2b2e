//! The boards store: one engine task, one published view.
//!
//! `BoardsStore` is a cloneable handle to an engine task that owns all
//! mutable state. The engine `select!`s over three inputs: the auth
//! watch, a single funnel of generation-tagged slot events fed by one
//! forwarder task per live query, and a command channel. Every state
//! transition happens on the engine task, so observers can never see a
//! half-applied update, and the published view moves only through
//! `Loading -> Ready`, `Ready -> Ready`, or `-> Unavailable`.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use corkboard_core::effects::{AuthStateEffects, BoardMutationEffects, LiveQueryEffects};
use corkboard_core::{Board, BoardId, Principal, QueryError, StoreError};

use crate::aggregator::{Observation, StreamAggregator};
use crate::query_set::{RoleQuerySet, RoleSlot};
use crate::selection::SelectionManager;

/// What the store currently knows about the principal's boards.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardsView {
    /// A rebuild is underway and not all role queries have reported.
    Loading,
    /// A role query failed; no partial data is shown.
    Unavailable { error: QueryError },
    /// The merged, deduplicated board set and the active selection.
    Ready {
        boards: Vec<Board>,
        active: Option<BoardId>,
    },
}

impl BoardsView {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The merged board list, when the view is ready.
    pub fn boards(&self) -> Option<&[Board]> {
        match self {
            Self::Ready { boards, .. } => Some(boards),
            _ => None,
        }
    }

    /// Fallible read of the merged set: `Ok(None)` while loading,
    /// `Ok(Some(..))` when ready, and the query failure otherwise.
    pub fn try_boards(&self) -> Result<Option<&[Board]>, StoreError> {
        match self {
            Self::Loading => Ok(None),
            Self::Ready { boards, .. } => Ok(Some(boards)),
            Self::Unavailable { error } => Err(StoreError::QueryUnavailable(error.clone())),
        }
    }

    pub fn active_id(&self) -> Option<BoardId> {
        match self {
            Self::Ready { active, .. } => *active,
            _ => None,
        }
    }

    /// The active board's snapshot, when one is selected.
    pub fn active_board(&self) -> Option<&Board> {
        match self {
            Self::Ready {
                boards,
                active: Some(id),
            } => boards.iter().find(|b| b.id == *id),
            _ => None,
        }
    }
}

/// Channel capacities for the engine's funnels.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    pub event_capacity: usize,
    pub command_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            event_capacity: 64,
            command_capacity: 16,
        }
    }
}

enum Command {
    Select {
        target: Option<BoardId>,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    DeleteActive {
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
}

/// One update out of a role query's forwarder, tagged with the
/// generation its query set was opened under.
enum SlotEvent {
    Emission {
        generation: u64,
        slot: RoleSlot,
        boards: Vec<Board>,
    },
    Failed {
        generation: u64,
        slot: RoleSlot,
        error: QueryError,
    },
}

/// Cloneable handle to a running boards engine.
#[derive(Clone)]
pub struct BoardsStore {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<BoardsView>,
    shutdown: mpsc::Sender<()>,
}

impl BoardsStore {
    /// Spawn the engine with default channel capacities.
    ///
    /// Must be called within a tokio runtime. The engine stops when
    /// `shutdown` is called or every handle has been dropped.
    pub fn spawn(
        queries: Arc<dyn LiveQueryEffects>,
        mutations: Arc<dyn BoardMutationEffects>,
        auth: &dyn AuthStateEffects,
    ) -> Self {
        Self::spawn_with_config(StoreConfig::default(), queries, mutations, auth)
    }

    pub fn spawn_with_config(
        config: StoreConfig,
        queries: Arc<dyn LiveQueryEffects>,
        mutations: Arc<dyn BoardMutationEffects>,
        auth: &dyn AuthStateEffects,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (view_tx, view_rx) = watch::channel(BoardsView::Loading);

        let engine = Engine {
            queries,
            mutations,
            auth_rx: auth.subscribe(),
            commands: command_rx,
            events_tx: event_tx,
            events_rx: event_rx,
            shutdown: shutdown_rx,
            view_tx,
            aggregator: StreamAggregator::new(),
            selection: SelectionManager::new(),
            live: None,
            merged: None,
        };
        tokio::spawn(engine.run());

        Self {
            commands: command_tx,
            view: view_rx,
            shutdown: shutdown_tx,
        }
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> BoardsView {
        self.view.borrow().clone()
    }

    /// A watch receiver over the published view, for reactive consumers.
    pub fn watch(&self) -> watch::Receiver<BoardsView> {
        self.view.clone()
    }

    /// Select `target` as the active board, or clear the selection with
    /// `None`. Fails with `BoardNotFound` if the target is not in the
    /// currently visible set (including while the view is loading).
    pub async fn select(&self, target: Option<BoardId>) -> Result<(), StoreError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Select { target, reply })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Closed)?
    }

    /// Delete the active board remotely and optimistically fall back to
    /// the first other visible board.
    pub async fn delete_active(&self) -> Result<(), StoreError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::DeleteActive { reply })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Closed)?
    }

    /// Ask the engine to stop. Idempotent; a no-op once stopped.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(()).await;
    }
}

struct Engine {
    queries: Arc<dyn LiveQueryEffects>,
    mutations: Arc<dyn BoardMutationEffects>,
    auth_rx: watch::Receiver<Option<Principal>>,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::Sender<SlotEvent>,
    events_rx: mpsc::Receiver<SlotEvent>,
    shutdown: mpsc::Receiver<()>,
    view_tx: watch::Sender<BoardsView>,
    aggregator: StreamAggregator,
    selection: SelectionManager,
    live: Option<RoleQuerySet>,
    /// Last merged set, `None` while loading or unavailable.
    merged: Option<Vec<Board>>,
}

impl Engine {
    async fn run(mut self) {
        info!("boards engine started");
        let initial = self.auth_rx.borrow_and_update().clone();
        self.rebuild(initial).await;

        loop {
            tokio::select! {
                changed = self.auth_rx.changed() => match changed {
                    Ok(()) => {
                        let principal = self.auth_rx.borrow_and_update().clone();
                        self.rebuild(principal).await;
                    }
                    // Auth collaborator went away; keep serving the last
                    // principal's view until told to stop.
                    Err(_) => {
                        warn!("auth watch closed");
                        self.run_without_auth().await;
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => self.on_slot_event(event),
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    // Every handle dropped.
                    None => break,
                },
                _ = self.shutdown.recv() => break,
            }
        }

        self.teardown_live();
        info!("boards engine stopped");
    }

    /// Same loop minus the auth branch, after the auth watch closed.
    async fn run_without_auth(&mut self) {
        loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => self.on_slot_event(event),
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => return,
                },
                _ = self.shutdown.recv() => return,
            }
        }
    }

    /// Tear down the previous principal's queries and build the next
    /// principal's, under a fresh generation. In-flight emissions from
    /// the old set arrive tagged with the old generation and fall out in
    /// the aggregator.
    async fn rebuild(&mut self, principal: Option<Principal>) {
        self.teardown_live();
        let generation = self.aggregator.advance_generation();
        self.selection.clear();
        self.merged = None;

        match principal {
            None => {
                debug!(generation, "no principal, publishing empty view");
                self.merged = Some(Vec::new());
                self.publish_ready();
            }
            Some(principal) => {
                debug!(generation, principal = %principal.id, "rebuilding role queries");
                self.view_tx.send_replace(BoardsView::Loading);
                match RoleQuerySet::subscribe(&*self.queries, &principal).await {
                    Ok(mut set) => {
                        for (slot, updates) in set.take_receivers() {
                            spawn_forwarder(generation, slot, updates, self.events_tx.clone());
                        }
                        self.live = Some(set);
                    }
                    Err(error) => {
                        warn!(generation, %error, "role query setup failed");
                        self.view_tx.send_replace(BoardsView::Unavailable { error });
                    }
                }
            }
        }
    }

    fn on_slot_event(&mut self, event: SlotEvent) {
        match event {
            SlotEvent::Emission {
                generation,
                slot,
                boards,
            } => match self.aggregator.observe(generation, slot, boards) {
                Observation::Stale => {
                    warn!(generation, %slot, "stale emission discarded");
                }
                Observation::Pending => {
                    trace!(generation, %slot, "slot reported, merge still pending");
                }
                Observation::Merged(boards) => {
                    self.selection.reconcile(&boards);
                    self.merged = Some(boards);
                    self.publish_ready();
                }
            },
            SlotEvent::Failed {
                generation,
                slot,
                error,
            } => {
                if generation == self.aggregator.generation() {
                    warn!(generation, %slot, %error, "role query failed");
                    // One dead query poisons the whole set: cancel the
                    // survivors and retire the generation, so a late
                    // emission cannot resurrect a `Ready` view over the
                    // failed slot's unmaintained data. Only the next
                    // auth transition rebuilds.
                    self.teardown_live();
                    self.aggregator.advance_generation();
                    self.merged = None;
                    self.selection.clear();
                    self.view_tx.send_replace(BoardsView::Unavailable { error });
                } else {
                    debug!(generation, %slot, "stale query failure ignored");
                }
            }
        }
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Select { target, reply } => {
                let visible = self.merged.as_deref().unwrap_or(&[]);
                let result = self.selection.select(target, visible);
                if result.is_ok() && self.merged.is_some() {
                    self.publish_ready();
                }
                let _ = reply.send(result);
            }
            Command::DeleteActive { reply } => {
                let result = self.delete_active().await;
                let _ = reply.send(result);
            }
        }
    }

    /// Delete the active board and fall back. Awaited here, on the
    /// engine task, so the fallback publish cannot interleave with
    /// other transitions; the eventual live-query republish then
    /// replaces the optimistic view wholesale.
    async fn delete_active(&mut self) -> Result<(), StoreError> {
        let Some(active) = self.selection.active() else {
            return Err(StoreError::NoActiveSelection);
        };
        self.mutations.delete_board(active).await?;

        let snapshot = self.merged.clone().unwrap_or_default();
        self.selection.fallback_after_delete(active, &snapshot);
        // The board itself leaves `merged` when the deletion flows back
        // through the live queries; only the selection moves eagerly.
        if self.merged.is_some() {
            self.publish_ready();
        }
        Ok(())
    }

    fn publish_ready(&mut self) {
        let boards = self.merged.clone().unwrap_or_default();
        self.view_tx.send_replace(BoardsView::Ready {
            boards,
            active: self.selection.active(),
        });
    }

    fn teardown_live(&mut self) {
        if let Some(set) = self.live.take() {
            debug!(generation = self.aggregator.generation(), "cancelling role queries");
            set.cancel_all();
        }
    }
}

fn spawn_forwarder(
    generation: u64,
    slot: RoleSlot,
    mut updates: mpsc::Receiver<Result<Vec<Board>, QueryError>>,
    events: mpsc::Sender<SlotEvent>,
) {
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            let event = match update {
                Ok(boards) => SlotEvent::Emission {
                    generation,
                    slot,
                    boards,
                },
                Err(error) => {
                    let _ = events
                        .send(SlotEvent::Failed {
                            generation,
                            slot,
                            error,
                        })
                        .await;
                    break;
                }
            };
            if events.send(event).await.is_err() {
                break;
            }
        }
        trace!(generation, %slot, "forwarder finished");
    });
}
