//! Shared types for Kraken private order channels
//!
//! This crate provides the core type definitions used across the workspace.
//! It has minimal dependencies and can be used independently.
//!
//! # Key Types
//!
//! - [`OrderUpdate`] - One partial update for one order
//! - [`OrderSnapshot`] - Merged view of an order across updates
//! - [`OrderStatus`] - Order status with the terminal set
//! - [`Batch`] - Updates delivered together by a channel
//! - [`PrivateMessage`] - Parsed private WebSocket frame
//! - [`KrakenError`] - Error types

pub mod error;
pub mod messages;
pub mod order;

// Re-export commonly used types
pub use error::*;
pub use messages::*;
pub use order::*;

// Re-export rust_decimal for users
pub use rust_decimal::Decimal;
