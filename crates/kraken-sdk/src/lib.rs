//! High-level open orders tracking for Kraken private WebSocket channels
//!
//! This crate wires authentication, a channel connector and the
//! reconciliation engine together behind a small builder API.
//!
//! # Quick Start
//!
//! ```no_run
//! use kraken_sdk::prelude::*;
//! use futures::stream::{self, Iter};
//! use std::vec::IntoIter;
//!
//! type Frames = Iter<IntoIter<Result<String, TransportError>>>;
//!
//! // Stands in for the socket layer that owns the private subscription
//! struct Canned;
//!
//! #[async_trait::async_trait]
//! impl ChannelConnector for Canned {
//!     type Channel = FrameChannel<Frames>;
//!
//!     async fn connect(&self, _name: &str, _auth: ChannelAuth) -> Result<Self::Channel, TransportError> {
//!         Ok(FrameChannel::new(stream::iter(Vec::new())))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orders = OpenOrdersBuilder::new()
//!         .with_token("ws-token")
//!         .connect(&Canned)
//!         .await?;
//!
//!     let mut closed = orders.closed();
//!     while let Some(Ok(order)) = closed.recv().await {
//!         println!("{} closed: {:?}", order.order_id(), order.reason());
//!     }
//!
//!     orders.teardown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Simple API**: Builder pattern for configuration
//! - **Auth Precedence**: Token, then credentials, then defaults
//! - **Consistent State**: Partial updates merged, closed orders never return
//! - **Event-Driven**: Snapshot, opened and closed streams

pub mod builder;
pub mod orders;
pub mod prelude;

// Re-export main types
pub use builder::{ChannelConnector, OpenOrdersBuilder};
pub use orders::{open_orders, wait_for_close};

// Re-export commonly used types from dependencies
pub use kraken_types::{OrderSnapshot, OrderStatus};
pub use kraken_ws::{OpenOrdersStream, StreamState};
