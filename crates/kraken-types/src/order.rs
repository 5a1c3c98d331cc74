//! Order update records and merged order snapshots
//!
//! Private order channels deliver *partial* updates: each update carries the
//! order id and only the fields that changed. [`OrderSnapshot`] accumulates
//! those partial updates into the best known view of an order.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Raw field map of an order update
pub type Fields = Map<String, Value>;

/// Wire field carrying the order status
pub const STATUS_FIELD: &str = "status";
/// Wire field carrying the average execution price
pub const AVG_PRICE_FIELD: &str = "avg_price";
/// Wire field carrying the cancel reason
pub const CANCEL_REASON_FIELD: &str = "cancel_reason";
/// Display price injected from [`AVG_PRICE_FIELD`]
pub const PRICE_FIELD: &str = "price";
/// Display reason injected from [`CANCEL_REASON_FIELD`]
pub const REASON_FIELD: &str = "reason";
/// Order id injected into every snapshot
pub const ORDER_ID_FIELD: &str = "orderid";

/// Order status as reported by the open orders channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    /// Order received but not yet live
    Pending,
    /// Order resting in the book
    Open,
    /// Order fully executed
    Closed,
    /// Order canceled
    Canceled,
    /// Order expired
    Expired,
    /// Any status outside the known set
    Other(String),
}

impl OrderStatus {
    /// Parse a wire status string
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "open" => Self::Open,
            "closed" => Self::Closed,
            "canceled" => Self::Canceled,
            "expired" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }

    /// Terminal statuses: the order will never be updated again
    ///
    /// The set is closed. Unknown statuses are never terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Canceled | Self::Expired)
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One partial update for one order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderUpdate {
    order_id: String,
    fields: Fields,
}

impl OrderUpdate {
    /// Create an update for `order_id` carrying `fields`
    pub fn new(order_id: impl Into<String>, fields: Fields) -> Self {
        Self {
            order_id: order_id.into(),
            fields,
        }
    }

    /// Build an update from `(field, value)` pairs
    pub fn from_pairs<K, V>(order_id: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(order_id, fields)
    }

    /// The order id, or `None` when it cannot be determined
    pub fn order_id(&self) -> Option<&str> {
        if self.order_id.trim().is_empty() {
            None
        } else {
            Some(&self.order_id)
        }
    }

    /// Fields carried by this update
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Status carried by this update, if any
    pub fn status(&self) -> Option<OrderStatus> {
        self.fields
            .get(STATUS_FIELD)
            .and_then(Value::as_str)
            .map(OrderStatus::parse)
    }
}

/// An ordered group of updates delivered together by a channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    /// Updates in delivery order
    pub updates: Vec<OrderUpdate>,
    /// Channel sequence number, when the wire message carries one
    pub sequence: Option<u64>,
}

impl Batch {
    /// Create a batch without a sequence number
    pub fn new(updates: Vec<OrderUpdate>) -> Self {
        Self {
            updates,
            sequence: None,
        }
    }

    /// Attach a sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

impl FromIterator<OrderUpdate> for Batch {
    fn from_iter<I: IntoIterator<Item = OrderUpdate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Cumulative view of one order across every update seen so far
///
/// Serializes as the flat field map, `orderid` included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSnapshot {
    #[serde(skip)]
    order_id: String,
    #[serde(flatten)]
    fields: Fields,
}

impl OrderSnapshot {
    /// Start an empty snapshot for `order_id`
    pub fn new(order_id: impl Into<String>) -> Self {
        let order_id = order_id.into();
        let mut fields = Fields::new();
        fields.insert(ORDER_ID_FIELD.to_string(), Value::String(order_id.clone()));
        Self { order_id, fields }
    }

    /// Merge an update on top of this snapshot, returning the new snapshot
    ///
    /// Layers, lowest first: the previous fields, the display fields derived
    /// from the update (`price` from `avg_price`, `reason` from
    /// `cancel_reason`), then the update's own fields. Fields absent from the
    /// update are left untouched.
    pub fn merged(&self, update: &OrderUpdate) -> Self {
        let mut next = self.clone();
        let incoming = update.fields();

        if let Some(avg) = incoming.get(AVG_PRICE_FIELD) {
            next.fields.insert(PRICE_FIELD.to_string(), avg.clone());
        }
        if let Some(reason) = incoming.get(CANCEL_REASON_FIELD) {
            next.fields.insert(REASON_FIELD.to_string(), reason.clone());
        }
        for (key, value) in incoming {
            next.fields.insert(key.clone(), value.clone());
        }
        next
    }

    /// The order id
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// All known fields, including the injected ones
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Raw field value
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field value when it is a string
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Field value parsed as a decimal (string or number on the wire)
    pub fn decimal(&self, name: &str) -> Option<Decimal> {
        match self.field(name)? {
            Value::String(s) => Decimal::from_str(s).ok(),
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            _ => None,
        }
    }

    /// Current status, if one has been seen
    pub fn status(&self) -> Option<OrderStatus> {
        self.field_str(STATUS_FIELD).map(OrderStatus::parse)
    }

    /// True once the merged status is terminal
    pub fn is_terminal(&self) -> bool {
        self.status().is_some_and(|s| s.is_terminal())
    }

    /// Display price (derived from the average execution price)
    pub fn price(&self) -> Option<Decimal> {
        self.decimal(PRICE_FIELD)
    }

    /// Display reason (derived from the cancel reason)
    pub fn reason(&self) -> Option<&str> {
        self.field_str(REASON_FIELD)
    }

    /// Order volume
    pub fn volume(&self) -> Option<Decimal> {
        self.decimal("vol")
    }

    /// Executed volume
    pub fn volume_executed(&self) -> Option<Decimal> {
        self.decimal("vol_exec")
    }
}
