//! Re-exports for convenience
//!
//! Import everything you need with:
//! ```
//! use kraken_sdk::prelude::*;
//! ```

// Builder
pub use crate::builder::{ChannelConnector, ConfigError, OpenOrdersBuilder, SetupError};

// Helpers
pub use crate::orders::{open_orders, wait_for_close, OrdersError};

// Types from kraken-types
pub use kraken_types::{Batch, KrakenError, OrderSnapshot, OrderStatus, OrderUpdate, PrivateMessage};

// Authentication
pub use kraken_auth::{AuthConfig, AuthError, ChannelAuth, Credentials};

// Engine types
pub use kraken_ws::{
    Channel, FrameChannel, OpenOrdersStream, ReconcilerStats, StreamChannel, StreamError,
    StreamState, Subscription, TransportError,
};

// Decimal for prices/quantities
pub use rust_decimal::Decimal;
