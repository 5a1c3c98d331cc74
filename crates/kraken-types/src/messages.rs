//! Wire parsing for the private `openOrders` channel
//!
//! Channel frames are JSON arrays:
//!
//! ```text
//! [ [ {"<order id>": { ...changed fields... }}, ... ], "openOrders", {"sequence": 7} ]
//! ```
//!
//! System frames (heartbeats, subscription status) are JSON objects and carry
//! no order data.

use crate::error::{KrakenError, KrakenResult};
use crate::order::{Batch, Fields, OrderUpdate};
use serde::Deserialize;
use serde_json::Value;

/// Channel name of the private open orders feed
pub const OPEN_ORDERS_CHANNEL: &str = "openOrders";

/// A decoded private channel frame
#[derive(Debug, Clone, PartialEq)]
pub enum PrivateMessage {
    /// Order updates from the open orders channel
    OpenOrders(Batch),
    /// System event (`heartbeat`, `subscriptionStatus`, ...)
    Event(String),
    /// Data for a channel this parser does not handle
    Other(String),
}

#[derive(Debug, Deserialize)]
struct SequenceInfo {
    sequence: Option<u64>,
}

impl PrivateMessage {
    /// Decode one raw text frame
    pub fn parse(raw: &str) -> KrakenResult<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| KrakenError::invalid_json(e, raw))?;

        match value {
            Value::Object(map) => {
                let event = map
                    .get("event")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                Ok(Self::Event(event))
            }
            Value::Array(parts) => Self::from_parts(parts, raw),
            _ => Err(KrakenError::UnexpectedMessage(raw.to_string())),
        }
    }

    fn from_parts(parts: Vec<Value>, raw: &str) -> KrakenResult<Self> {
        let mut parts = parts.into_iter();
        let payload = parts.next();
        let channel = match parts.next() {
            Some(Value::String(name)) => name,
            _ => return Err(KrakenError::UnexpectedMessage(raw.to_string())),
        };

        if channel != OPEN_ORDERS_CHANNEL {
            return Ok(Self::Other(channel));
        }

        let entries = match payload {
            Some(Value::Array(entries)) => entries,
            _ => return Err(KrakenError::UnexpectedMessage(raw.to_string())),
        };

        let mut updates = Vec::with_capacity(entries.len());
        for entry in entries {
            let Value::Object(map) = entry else {
                return Err(KrakenError::UnexpectedMessage(raw.to_string()));
            };
            if map.is_empty() {
                // No key to read the id from; the reconciler skips it
                updates.push(OrderUpdate::default());
                continue;
            }
            for (order_id, fields) in map {
                let fields = match fields {
                    Value::Object(fields) => fields,
                    Value::Null => Fields::new(),
                    _ => return Err(KrakenError::UnexpectedMessage(raw.to_string())),
                };
                updates.push(OrderUpdate::new(order_id, fields));
            }
        }

        let mut batch = Batch::new(updates);
        if let Some(info) = parts.next() {
            if let Ok(SequenceInfo { sequence: Some(seq) }) = serde_json::from_value(info) {
                batch = batch.with_sequence(seq);
            }
        }
        Ok(Self::OpenOrders(batch))
    }

    /// The batch, if this frame carries open order updates
    pub fn into_batch(self) -> Option<Batch> {
        match self {
            Self::OpenOrders(batch) => Some(batch),
            _ => None,
        }
    }
}
