//! Open orders stream
//!
//! [`OpenOrdersStream`] drives a [`Channel`] through a [`Reconciler`] on a
//! background task and fans the results out to three streams:
//!
//! | stream | semantics |
//! |--------|-----------|
//! | [`snapshots`](OpenOrdersStream::snapshots) | full open orders list after every batch, latest value replayed to late subscribers |
//! | [`opened`](OpenOrdersStream::opened) | one event per newly seen order, no replay |
//! | [`closed`](OpenOrdersStream::closed) | one event per order reaching a terminal status, no replay |
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use kraken_ws::{OpenOrdersStream, StreamChannel};
//!
//! # async fn example(frames: impl futures::Stream<Item = Result<kraken_types::Batch, kraken_ws::TransportError>> + Send + Unpin + 'static) {
//! let orders = OpenOrdersStream::spawn(StreamChannel::new(frames));
//!
//! let mut closed = orders.closed();
//! tokio::spawn(async move {
//!     while let Some(Ok(order)) = closed.next().await {
//!         println!("{} closed at {:?}", order.order_id(), order.price());
//!     }
//! });
//!
//! // ...
//! orders.teardown().await;
//! # }
//! ```
//!
//! # Consistency
//!
//! Applying a batch and publishing its events happen under one lock, and
//! teardown takes the same lock. A batch is therefore either fully applied
//! and published or not applied at all, and nothing is published once
//! [`teardown`](OpenOrdersStream::teardown) has returned.

use crate::channel::{Channel, TransportError};
use crate::reconciler::{OpenIndex, Reconciler, ReconcilerStats, Transition};
use crate::subject::{ReplaySubject, Subject, Subscription};
use kraken_types::{Batch, OrderSnapshot};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Run state of an open orders stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Accepting batches
    Running,
    /// The channel failed; state frozen at the last applied batch
    Failed,
    /// The channel ended gracefully
    Ended,
    /// Torn down by the caller
    TornDown,
}

struct Engine {
    reconciler: Reconciler,
    state: StreamState,
}

struct Shared {
    engine: Mutex<Engine>,
    snapshots: ReplaySubject<Vec<OrderSnapshot>>,
    opened: Subject<OrderSnapshot>,
    closed: Subject<OrderSnapshot>,
}

impl Shared {
    fn new() -> Self {
        Self {
            engine: Mutex::new(Engine {
                reconciler: Reconciler::new(),
                state: StreamState::Running,
            }),
            snapshots: ReplaySubject::new(),
            opened: Subject::new(),
            closed: Subject::new(),
        }
    }

    /// Apply and publish one batch; false once the stream stopped running
    fn apply(&self, batch: &Batch) -> bool {
        let mut engine = self.engine.lock();
        if engine.state != StreamState::Running {
            return false;
        }

        let outcome = engine.reconciler.apply_batch(batch);
        for transition in outcome.transitions {
            match transition {
                Transition::Opened(order) => self.opened.next(order),
                Transition::Closed(order) => self.closed.next(order),
            };
        }
        self.snapshots.next(outcome.snapshot);
        true
    }

    fn fail(&self, err: TransportError) {
        let mut engine = self.engine.lock();
        if engine.state != StreamState::Running {
            return;
        }
        error!(error = %err, "Open orders channel failed");
        engine.state = StreamState::Failed;
        self.snapshots.error(err.clone());
        self.opened.error(err.clone());
        self.closed.error(err);
    }

    fn finish(&self, state: StreamState) -> bool {
        let mut engine = self.engine.lock();
        match engine.state {
            StreamState::TornDown => false,
            StreamState::Running | StreamState::Failed | StreamState::Ended => {
                engine.state = state;
                self.snapshots.complete();
                self.opened.complete();
                self.closed.complete();
                true
            }
        }
    }
}

/// Read-only view of the live reconciler state
///
/// Holds the engine lock: batches wait while a view is alive, so keep it
/// short-lived and never hold it across `.await`.
pub struct StateView<'a> {
    engine: MutexGuard<'a, Engine>,
}

impl StateView<'_> {
    /// Open orders in first-seen order
    pub fn open_index(&self) -> &OpenIndex {
        self.engine.reconciler.open_index()
    }

    /// Ids closed during this run
    pub fn closed_ids(&self) -> &HashSet<String> {
        self.engine.reconciler.closed_ids()
    }

    /// Counters
    pub fn stats(&self) -> &ReconcilerStats {
        self.engine.reconciler.stats()
    }

    /// Run state
    pub fn state(&self) -> StreamState {
        self.engine.state
    }
}

/// Handle to a running open orders reconciliation
///
/// State is scoped to this handle: after a channel failure, build a new one
/// once the transport has recovered. Dropping the handle stops the
/// background task and closes the channel.
pub struct OpenOrdersStream {
    shared: Arc<Shared>,
    shutdown: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl OpenOrdersStream {
    /// Start reconciling batches from `channel`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C>(channel: C) -> Self
    where
        C: Channel + 'static,
    {
        let shared = Arc::new(Shared::new());
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(drive(channel, Arc::clone(&shared), Arc::clone(&shutdown)));
        info!("Open orders stream started");

        Self {
            shared,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    /// Full open orders list after every batch (latest replayed)
    pub fn snapshots(&self) -> Subscription<Vec<OrderSnapshot>> {
        self.shared.snapshots.subscribe()
    }

    /// Newly seen orders
    pub fn opened(&self) -> Subscription<OrderSnapshot> {
        self.shared.opened.subscribe()
    }

    /// Orders that reached a terminal status, with their final snapshot
    pub fn closed(&self) -> Subscription<OrderSnapshot> {
        self.shared.closed.subscribe()
    }

    /// Most recent snapshot emission, if any batch has been applied
    pub fn latest_snapshot(&self) -> Option<Vec<OrderSnapshot>> {
        self.shared.snapshots.latest()
    }

    /// Live read-only view of the reconciler state
    ///
    /// The view holds the engine lock. Do not hold it across `.await`: the
    /// driver task blocks on the same lock. Use [`open_orders`],
    /// [`get`] or [`closed_ids`] for owned copies instead.
    ///
    /// [`open_orders`]: Self::open_orders
    /// [`get`]: Self::get
    /// [`closed_ids`]: Self::closed_ids
    pub fn state(&self) -> StateView<'_> {
        StateView {
            engine: self.shared.engine.lock(),
        }
    }

    /// Copy of the currently open orders
    pub fn open_orders(&self) -> Vec<OrderSnapshot> {
        self.state().open_index().to_vec()
    }

    /// Current snapshot of one open order
    pub fn get(&self, order_id: &str) -> Option<OrderSnapshot> {
        self.state().open_index().get(order_id).cloned()
    }

    /// Copy of the ids closed during this run
    pub fn closed_ids(&self) -> HashSet<String> {
        self.state().closed_ids().clone()
    }

    /// True if the order closed during this run
    pub fn is_closed(&self, order_id: &str) -> bool {
        self.state().closed_ids().contains(order_id)
    }

    /// Counters
    pub fn stats(&self) -> ReconcilerStats {
        self.state().stats().clone()
    }

    /// Run state
    pub fn stream_state(&self) -> StreamState {
        self.state().state()
    }

    /// True while batches are being accepted
    pub fn is_running(&self) -> bool {
        self.stream_state() == StreamState::Running
    }

    /// Stop the stream and release the channel
    ///
    /// Completes all three streams, asks the channel to close and waits for
    /// the background task to finish. Safe to call while a batch is being
    /// applied; calling it again does nothing.
    #[instrument(skip(self))]
    pub async fn teardown(&self) {
        if self.shared.finish(StreamState::TornDown) {
            info!("Open orders stream torn down");
        }
        self.shutdown.notify_one();

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!("Open orders task panicked");
                }
            }
        }
    }
}

impl Drop for OpenOrdersStream {
    fn drop(&mut self) {
        self.shutdown.notify_one();
    }
}

impl std::fmt::Debug for OpenOrdersStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.state();
        f.debug_struct("OpenOrdersStream")
            .field("state", &view.state())
            .field("open", &view.open_index().len())
            .field("closed", &view.closed_ids().len())
            .finish()
    }
}

async fn drive<C: Channel>(mut channel: C, shared: Arc<Shared>, shutdown: Arc<Notify>) {
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            next = channel.next_batch() => next,
        };

        match next {
            Some(Ok(batch)) => {
                if !shared.apply(&batch) {
                    break;
                }
            }
            Some(Err(e)) => {
                shared.fail(e);
                shutdown.notified().await;
                break;
            }
            None => {
                debug!("Open orders channel ended");
                shared.finish(StreamState::Ended);
                shutdown.notified().await;
                break;
            }
        }
    }

    if let Err(e) = channel.close().await {
        warn!(error = %e, "Failed to close open orders channel");
    }
    debug!("Open orders channel closed");
}
