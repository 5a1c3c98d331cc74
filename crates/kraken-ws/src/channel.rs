//! Channel abstraction
//!
//! A [`Channel`] is the source of order update batches for one private
//! subscription. Opening the socket, authenticating, heartbeats and
//! reconnection all live behind it; the reconciliation engine only pulls
//! batches and asks for the channel to be closed.
//!
//! # Example
//!
//! ```no_run
//! use futures::stream;
//! use kraken_types::{Batch, OrderUpdate};
//! use kraken_ws::channel::{Channel, StreamChannel, TransportError};
//!
//! # async fn example() -> Result<(), TransportError> {
//! let batches = vec![Ok::<_, TransportError>(Batch::new(vec![OrderUpdate::from_pairs("O1", [("status", "open")])]))];
//! let mut channel = StreamChannel::new(stream::iter(batches));
//!
//! while let Some(batch) = channel.next_batch().await {
//!     println!("{} updates", batch?.len());
//! }
//! channel.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use kraken_types::{Batch, PrivateMessage};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Transport layer errors
///
/// Terminal for a reconciliation run: the engine stops and forwards the
/// error to every stream. Retrying is the transport's business.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed
    #[error("connection closed")]
    ConnectionClosed,

    /// Receive failed
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Connection timeout
    #[error("connection timeout after {0:?}")]
    Timeout(Duration),

    /// Authentication rejected by the server
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Protocol error
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Source of order update batches
///
/// `next_batch` must be cancel safe: the engine races it against teardown
/// and drops the pending future when teardown wins.
#[async_trait]
pub trait Channel: Send {
    /// Wait for the next batch
    ///
    /// Returns `None` once the channel has ended gracefully.
    async fn next_batch(&mut self) -> Option<Result<Batch, TransportError>>;

    /// Release the channel (unsubscribe, close the socket)
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Box<C> {
    async fn next_batch(&mut self) -> Option<Result<Batch, TransportError>> {
        (**self).next_batch().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }
}

/// Channel over any stream of batches
pub struct StreamChannel<S> {
    stream: Option<S>,
}

impl<S> StreamChannel<S> {
    /// Wrap a stream of batches
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// True once [`Channel::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

#[async_trait]
impl<S> Channel for StreamChannel<S>
where
    S: Stream<Item = Result<Batch, TransportError>> + Send + Unpin,
{
    async fn next_batch(&mut self) -> Option<Result<Batch, TransportError>> {
        match self.stream.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream = None;
        Ok(())
    }
}

/// Channel over raw text frames of a private WebSocket connection
///
/// Decodes `openOrders` frames into batches and skips everything else
/// (heartbeats, subscription status, other channels). Frames that fail to
/// parse are logged and skipped.
pub struct FrameChannel<S> {
    frames: Option<S>,
    skipped: u64,
}

impl<S> FrameChannel<S> {
    /// Wrap a stream of text frames
    pub fn new(frames: S) -> Self {
        Self {
            frames: Some(frames),
            skipped: 0,
        }
    }

    /// Number of frames that were not open order batches
    pub fn skipped_frames(&self) -> u64 {
        self.skipped
    }
}

#[async_trait]
impl<S> Channel for FrameChannel<S>
where
    S: Stream<Item = Result<String, TransportError>> + Send + Unpin,
{
    async fn next_batch(&mut self) -> Option<Result<Batch, TransportError>> {
        loop {
            let frame = self.frames.as_mut()?.next().await?;
            let text = match frame {
                Ok(text) => text,
                Err(e) => return Some(Err(e)),
            };

            match PrivateMessage::parse(&text) {
                Ok(PrivateMessage::OpenOrders(batch)) => return Some(Ok(batch)),
                Ok(PrivateMessage::Event(event)) => {
                    debug!(event = %event, "Skipping system frame");
                }
                Ok(PrivateMessage::Other(channel)) => {
                    debug!(channel = %channel, "Skipping frame for other channel");
                }
                Err(e) => {
                    warn!(error = %e, "Skipping malformed frame");
                }
            }
            self.skipped += 1;
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.frames = None;
        Ok(())
    }
}

/// Scripted channel for tests
///
/// Batches and errors are fed through a [`MockController`]; the channel
/// waits for the next item just like a live subscription would. Dropping the
/// controller ends the channel gracefully.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockChannel {
    rx: tokio::sync::mpsc::UnboundedReceiver<Result<Batch, TransportError>>,
    close_calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

/// Feeds a [`MockChannel`]
#[cfg(any(test, feature = "test-utils"))]
#[derive(Clone)]
pub struct MockController {
    tx: tokio::sync::mpsc::UnboundedSender<Result<Batch, TransportError>>,
    close_calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockChannel {
    /// Create a mock channel and its controller
    pub fn new() -> (Self, MockController) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let close_calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        (
            Self {
                rx,
                close_calls: close_calls.clone(),
            },
            MockController { tx, close_calls },
        )
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl MockController {
    /// Deliver a batch
    pub fn push_batch(&self, batch: Batch) {
        let _ = self.tx.send(Ok(batch));
    }

    /// Deliver a transport failure
    pub fn push_error(&self, error: TransportError) {
        let _ = self.tx.send(Err(error));
    }

    /// How many times the channel was closed
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Channel for MockChannel {
    async fn next_batch(&mut self) -> Option<Result<Batch, TransportError>> {
        self.rx.recv().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.close_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.rx.close();
        Ok(())
    }
}
