//! Open orders reconciliation for Kraken private WebSocket channels
//!
//! This crate turns the raw, partial order updates of a private channel into
//! consistent open-orders state and three event streams.
//!
//! # Features
//!
//! - Field-level merging of partial order updates
//! - Terminal status detection; closed orders are never resurrected
//! - Latest-snapshot replay for late subscribers
//! - Transport failures propagated to every stream without touching state
//! - Idempotent teardown that releases the channel
//!
//! # Example
//!
//! ```no_run
//! use futures::stream;
//! use kraken_ws::{FrameChannel, OpenOrdersStream, TransportError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let frames = stream::iter(vec![Ok::<_, TransportError>(
//!         r#"[[{"O1": {"status": "open", "avg_price": "10"}}], "openOrders", {"sequence": 1}]"#.to_string(),
//!     )]);
//!
//!     let orders = OpenOrdersStream::spawn(FrameChannel::new(frames));
//!     let mut snapshots = orders.snapshots();
//!
//!     if let Some(Ok(open)) = snapshots.recv().await {
//!         println!("{} open orders", open.len());
//!     }
//!
//!     orders.teardown().await;
//! }
//! ```

pub mod channel;
pub mod open_orders;
pub mod reconciler;
pub mod subject;

// Re-export main types
pub use channel::{Channel, FrameChannel, StreamChannel, TransportError};
pub use open_orders::{OpenOrdersStream, StateView, StreamState};
pub use reconciler::{BatchOutcome, OpenIndex, Reconciler, ReconcilerStats, Transition, UpdateOutcome};
pub use subject::{ReplaySubject, StreamError, Subject, Subscription};

#[cfg(any(test, feature = "test-utils"))]
pub use channel::{MockChannel, MockController};
