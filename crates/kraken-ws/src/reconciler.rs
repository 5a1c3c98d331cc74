//! Open orders state reconciler
//!
//! Turns partial order updates into a consistent view of the account's open
//! orders. Each update is merged onto what is already known about its order
//! and classified into a lifecycle transition:
//!
//! ```text
//!   first update ──► Opened ──► Updated* ──► Closed (terminal status)
//!                                               │
//!   any later update for a closed id ◄── Stale ─┘  (dropped)
//! ```
//!
//! Invariants held after every update:
//!
//! - an id in the closed set is never in the open index,
//! - an id enters the closed set at most once,
//! - merged fields are only added or overwritten, never lost.
//!
//! The reconciler is a plain synchronous state machine; fan-out and task
//! management live in [`crate::open_orders`].

use kraken_types::{Batch, OrderSnapshot, OrderUpdate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, instrument, trace, warn};

/// Lifecycle transition produced by one update
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// First update seen for an order
    Opened(OrderSnapshot),
    /// Order reached a terminal status; carries the final snapshot
    Closed(OrderSnapshot),
}

impl Transition {
    /// Snapshot carried by the transition
    pub fn snapshot(&self) -> &OrderSnapshot {
        match self {
            Self::Opened(s) | Self::Closed(s) => s,
        }
    }
}

/// How a single update was classified
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// New order entered the open index
    Opened(OrderSnapshot),
    /// Known open order changed, still open
    Updated,
    /// Known open order reached a terminal status
    Closed(OrderSnapshot),
    /// Update for an already closed order, dropped
    Stale,
    /// Update without a usable order id, dropped
    Unresolved,
}

/// Result of applying one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Opened/closed transitions in update order
    pub transitions: Vec<Transition>,
    /// Open index contents after the batch
    pub snapshot: Vec<OrderSnapshot>,
    /// Updates that changed an open order without a transition
    pub updated: usize,
    /// Updates dropped because their order was already closed
    pub stale: usize,
    /// Updates dropped because their id could not be determined
    pub unresolved: usize,
}

/// Reconciler counters
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerStats {
    /// Batches applied
    pub batches: u64,
    /// Orders opened
    pub opened: u64,
    /// In-place updates of open orders
    pub updated: u64,
    /// Orders closed
    pub closed: u64,
    /// Stale updates dropped
    pub stale: u64,
    /// Updates without an order id
    pub unresolved: u64,
}

/// Open orders in first-seen order
///
/// Entries keep their position when updated, so iteration (and therefore
/// every snapshot emission) lists orders in the order they were opened.
#[derive(Debug, Clone, Default)]
pub struct OpenIndex {
    entries: BTreeMap<u64, OrderSnapshot>,
    positions: HashMap<String, u64>,
    next_position: u64,
}

impl OpenIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for an open order
    pub fn get(&self, order_id: &str) -> Option<&OrderSnapshot> {
        self.positions
            .get(order_id)
            .and_then(|pos| self.entries.get(pos))
    }

    /// True if the order is open
    pub fn contains(&self, order_id: &str) -> bool {
        self.positions.contains_key(order_id)
    }

    /// Insert or replace, keeping the original position of known ids
    fn upsert(&mut self, snapshot: OrderSnapshot) {
        match self.positions.get(snapshot.order_id()) {
            Some(pos) => {
                self.entries.insert(*pos, snapshot);
            }
            None => {
                let pos = self.next_position;
                self.next_position += 1;
                self.positions.insert(snapshot.order_id().to_string(), pos);
                self.entries.insert(pos, snapshot);
            }
        }
    }

    fn remove(&mut self, order_id: &str) -> Option<OrderSnapshot> {
        let pos = self.positions.remove(order_id)?;
        self.entries.remove(&pos)
    }

    /// Number of open orders
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no open orders
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Open orders in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &OrderSnapshot> {
        self.entries.values()
    }

    /// Open order ids in first-seen order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|s| s.order_id())
    }

    /// Owned copy of the open orders, in first-seen order
    pub fn to_vec(&self) -> Vec<OrderSnapshot> {
        self.entries.values().cloned().collect()
    }
}

/// Open orders reconciler
#[derive(Debug, Default)]
pub struct Reconciler {
    open: OpenIndex,
    closed: HashSet<String>,
    stats: ReconcilerStats,
}

impl Reconciler {
    /// Create an empty reconciler
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every update of `batch` in order and report what happened
    #[instrument(skip(self, batch), fields(updates = batch.len(), sequence = ?batch.sequence))]
    pub fn apply_batch(&mut self, batch: &Batch) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for update in &batch.updates {
            match self.apply_update(update) {
                UpdateOutcome::Opened(s) => outcome.transitions.push(Transition::Opened(s)),
                UpdateOutcome::Closed(s) => outcome.transitions.push(Transition::Closed(s)),
                UpdateOutcome::Updated => outcome.updated += 1,
                UpdateOutcome::Stale => outcome.stale += 1,
                UpdateOutcome::Unresolved => outcome.unresolved += 1,
            }
        }

        self.stats.batches += 1;
        outcome.snapshot = self.open.to_vec();

        debug!(
            transitions = outcome.transitions.len(),
            open = outcome.snapshot.len(),
            "Batch applied"
        );
        outcome
    }

    /// Apply a single update
    pub fn apply_update(&mut self, update: &OrderUpdate) -> UpdateOutcome {
        let Some(order_id) = update.order_id() else {
            warn!("Dropping update without order id");
            self.stats.unresolved += 1;
            return UpdateOutcome::Unresolved;
        };

        if self.closed.contains(order_id) {
            // Duplicate delivery racing the close
            if self.open.remove(order_id).is_some() {
                warn!(order_id, "Removed closed order still present in open index");
            }
            trace!(order_id, "Dropping stale update");
            self.stats.stale += 1;
            return UpdateOutcome::Stale;
        }

        let merged = match self.open.get(order_id) {
            Some(previous) => previous.merged(update),
            None => {
                let merged = OrderSnapshot::new(order_id).merged(update);
                self.open.upsert(merged.clone());
                self.stats.opened += 1;
                debug!(order_id, status = ?merged.status(), "Order opened");
                return UpdateOutcome::Opened(merged);
            }
        };

        if merged.is_terminal() {
            self.open.remove(order_id);
            self.closed.insert(order_id.to_string());
            self.stats.closed += 1;
            debug!(order_id, status = ?merged.status(), "Order closed");
            UpdateOutcome::Closed(merged)
        } else {
            self.open.upsert(merged);
            self.stats.updated += 1;
            UpdateOutcome::Updated
        }
    }

    /// Currently open orders
    pub fn open_index(&self) -> &OpenIndex {
        &self.open
    }

    /// Ids of every order closed during this run
    pub fn closed_ids(&self) -> &HashSet<String> {
        &self.closed
    }

    /// True if the order has been closed during this run
    pub fn is_closed(&self, order_id: &str) -> bool {
        self.closed.contains(order_id)
    }

    /// Counters
    pub fn stats(&self) -> &ReconcilerStats {
        &self.stats
    }
}
