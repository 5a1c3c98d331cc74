//! Common test utilities and fixtures for integration tests
//!
//! Frames follow the shape of Kraken's private `openOrders` channel

#![allow(dead_code)]

use async_trait::async_trait;
use kraken_auth::ChannelAuth;
use kraken_sdk::ChannelConnector;
use kraken_ws::{FrameChannel, MockChannel, MockController, TransportError};
use std::sync::Mutex;
use std::time::Duration;

/// First snapshot after subscribing: one pending limit order
pub const INITIAL_FRAME: &str = r#"[
    [{"OQCLML-BW3P3-BUCMWZ": {
        "status": "pending",
        "vol": "1.25",
        "vol_exec": "0.00",
        "descr": {"pair": "XBT/USD", "type": "buy", "ordertype": "limit", "price": "30000.0"}
    }}],
    "openOrders",
    {"sequence": 1}
]"#;

/// Order accepted by the matching engine
pub const OPEN_FRAME: &str = r#"[
    [{"OQCLML-BW3P3-BUCMWZ": {"status": "open"}}],
    "openOrders",
    {"sequence": 2}
]"#;

/// Partial fill followed by a cancel in the same frame
pub const CANCEL_FRAME: &str = r#"[
    [
        {"OQCLML-BW3P3-BUCMWZ": {"vol_exec": "0.50", "avg_price": "29999.5"}},
        {"OQCLML-BW3P3-BUCMWZ": {"status": "canceled", "cancel_reason": "User requested"}}
    ],
    "openOrders",
    {"sequence": 3}
]"#;

/// Late update for an order that is already closed
pub const STALE_FRAME: &str = r#"[
    [{"OQCLML-BW3P3-BUCMWZ": {"status": "open"}}],
    "openOrders",
    {"sequence": 4}
]"#;

/// Non-channel traffic
pub const HEARTBEAT_FRAME: &str = r#"{"event": "heartbeat"}"#;

/// What a connector was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeenAuth {
    Token(String),
    Credentials(String),
}

/// Connector handing out a single [`MockChannel`]
pub struct MockConnector {
    channel: Mutex<Option<MockChannel>>,
    seen: Mutex<Vec<(String, SeenAuth)>>,
    delay: Option<Duration>,
    fail_with: Option<TransportError>,
}

impl MockConnector {
    pub fn new() -> (Self, MockController) {
        let (channel, controller) = MockChannel::new();
        let connector = Self {
            channel: Mutex::new(Some(channel)),
            seen: Mutex::new(Vec::new()),
            delay: None,
            fail_with: None,
        };
        (connector, controller)
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Refuse every connection
    pub fn failing(mut self, error: TransportError) -> Self {
        self.fail_with = Some(error);
        self
    }

    /// Channel names and auth received so far
    pub fn seen(&self) -> Vec<(String, SeenAuth)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelConnector for MockConnector {
    type Channel = MockChannel;

    async fn connect(
        &self,
        channel_name: &str,
        auth: ChannelAuth,
    ) -> Result<MockChannel, TransportError> {
        let seen = match &auth {
            ChannelAuth::Token(_) => SeenAuth::Token(auth.token().unwrap_or_default().to_string()),
            ChannelAuth::Credentials(creds) => SeenAuth::Credentials(creds.api_key().to_string()),
        };
        self.seen.lock().unwrap().push((channel_name.to_string(), seen));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        self.channel
            .lock()
            .unwrap()
            .take()
            .ok_or(TransportError::ConnectionClosed)
    }
}

pub type FrameSender = futures::channel::mpsc::UnboundedSender<Result<String, TransportError>>;
type FrameReceiver = futures::channel::mpsc::UnboundedReceiver<Result<String, TransportError>>;

/// Connector producing a [`FrameChannel`] fed with raw text frames
pub struct FrameConnector {
    frames: Mutex<Option<FrameReceiver>>,
}

impl FrameConnector {
    pub fn new() -> (Self, FrameSender) {
        let (tx, rx) = futures::channel::mpsc::unbounded();
        let connector = Self {
            frames: Mutex::new(Some(rx)),
        };
        (connector, tx)
    }
}

#[async_trait]
impl ChannelConnector for FrameConnector {
    type Channel = FrameChannel<FrameReceiver>;

    async fn connect(
        &self,
        _channel_name: &str,
        _auth: ChannelAuth,
    ) -> Result<Self::Channel, TransportError> {
        let frames = self
            .frames
            .lock()
            .unwrap()
            .take()
            .ok_or(TransportError::ConnectionClosed)?;
        Ok(FrameChannel::new(frames))
    }
}

/// Push a text frame
pub fn send(tx: &FrameSender, frame: &str) {
    tx.unbounded_send(Ok(frame.to_string())).unwrap();
}
