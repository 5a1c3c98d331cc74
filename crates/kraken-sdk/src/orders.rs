//! Consumer helpers on top of [`OpenOrdersStream`]
//!
//! ```no_run
//! use kraken_sdk::orders::{open_orders, wait_for_close};
//! # use kraken_ws::OpenOrdersStream;
//! use std::time::Duration;
//!
//! # async fn run(stream: OpenOrdersStream) -> Result<(), kraken_sdk::orders::OrdersError> {
//! let open = open_orders(&stream, Duration::from_secs(5)).await?;
//! for order in &open {
//!     println!("{} {:?}", order.order_id(), order.status());
//! }
//!
//! let last = wait_for_close(&stream, "OQCLML-BW3P3-BUCMWZ", Duration::from_secs(60)).await?;
//! println!("closed with reason {:?}", last.reason());
//! # Ok(())
//! # }
//! ```

use kraken_types::OrderSnapshot;
use kraken_ws::{OpenOrdersStream, StreamError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

/// Helper errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrdersError {
    /// Nothing arrived in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The stream failed
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The stream ended before producing a result
    #[error("stream ended")]
    Ended,

    /// The order closed before the helper subscribed
    #[error("order {0} already closed")]
    AlreadyClosed(String),
}

/// Current open orders
///
/// Returns the latest snapshot, waiting up to `wait` for the first batch if
/// none has been applied yet.
pub async fn open_orders(
    stream: &OpenOrdersStream,
    wait: Duration,
) -> Result<Vec<OrderSnapshot>, OrdersError> {
    let mut snapshots = stream.snapshots();
    match timeout(wait, snapshots.recv()).await {
        Ok(Some(Ok(open))) => Ok(open),
        Ok(Some(Err(e))) => Err(e.into()),
        Ok(None) => Err(OrdersError::Ended),
        Err(_) => Err(OrdersError::Timeout(wait)),
    }
}

/// Wait until `order_id` reaches a terminal status
///
/// Resolves with the order's final snapshot.
pub async fn wait_for_close(
    stream: &OpenOrdersStream,
    order_id: &str,
    wait: Duration,
) -> Result<OrderSnapshot, OrdersError> {
    // Subscribe before checking, so a close between the two is not lost
    let mut closed = stream.closed();
    if stream.is_closed(order_id) {
        return Err(OrdersError::AlreadyClosed(order_id.to_string()));
    }

    let watch = async {
        while let Some(event) = closed.recv().await {
            let snapshot = event?;
            if snapshot.order_id() == order_id {
                return Ok(snapshot);
            }
            debug!(order_id = snapshot.order_id(), "Skipping unrelated close");
        }
        Err(OrdersError::Ended)
    };

    timeout(wait, watch)
        .await
        .map_err(|_| OrdersError::Timeout(wait))?
}
