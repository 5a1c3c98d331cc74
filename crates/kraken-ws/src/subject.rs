//! Minimal publish/subscribe streams
//!
//! Two flavours of multicast:
//!
//! - [`Subject`]: fire-and-forget. Only subscribers attached when a value is
//!   published receive it.
//! - [`ReplaySubject`]: keeps the latest value. A late subscriber receives it
//!   immediately, then everything published afterwards.
//!
//! Both can be terminated once, either with [`error`](Subject::error) (every
//! subscriber gets one `Err` and then the stream ends) or with
//! [`complete`](Subject::complete) (streams just end). After that, publishing
//! is a no-op.
//!
//! Each subscriber owns an unbounded queue, so a slow consumer never blocks
//! the publisher and never misses a value.

use crate::channel::TransportError;
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;

/// Error notification delivered on a stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The upstream channel failed
    #[error("channel failed: {0}")]
    Transport(#[from] TransportError),
}

type Notification<T> = Result<T, StreamError>;

/// Receiving end of a subject
///
/// Yields `Ok(value)` for each emission, at most one `Err` on failure, and
/// `None` once the subject has terminated (or was dropped).
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<Notification<T>>,
}

impl<T> Subscription<T> {
    /// Wait for the next notification
    pub async fn recv(&mut self) -> Option<Notification<T>> {
        self.rx.recv().await
    }

    /// Take an already delivered notification without waiting
    pub fn try_recv(&mut self) -> Option<Notification<T>> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Notification<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

#[derive(Debug, Clone)]
enum Terminal {
    Completed,
    Errored(StreamError),
}

#[derive(Debug)]
struct Hub<T> {
    subscribers: Vec<mpsc::UnboundedSender<Notification<T>>>,
    latest: Option<T>,
    replay: bool,
    terminal: Option<Terminal>,
}

impl<T: Clone> Hub<T> {
    fn new(replay: bool) -> Self {
        Self {
            subscribers: Vec::new(),
            latest: None,
            replay,
            terminal: None,
        }
    }

    fn subscribe(&mut self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(latest) = &self.latest {
            let _ = tx.send(Ok(latest.clone()));
        }
        match &self.terminal {
            None => self.subscribers.push(tx),
            Some(Terminal::Errored(e)) => {
                let _ = tx.send(Err(e.clone()));
            }
            // Dropping tx ends the stream after any replayed value
            Some(Terminal::Completed) => {}
        }
        Subscription { rx }
    }

    fn next(&mut self, value: T) -> bool {
        if self.terminal.is_some() {
            return false;
        }
        self.subscribers
            .retain(|tx| tx.send(Ok(value.clone())).is_ok());
        if self.replay {
            self.latest = Some(value);
        }
        true
    }

    fn terminate(&mut self, terminal: Terminal) -> bool {
        if self.terminal.is_some() {
            return false;
        }
        if let Terminal::Errored(e) = &terminal {
            for tx in &self.subscribers {
                let _ = tx.send(Err(e.clone()));
            }
        }
        self.subscribers.clear();
        self.terminal = Some(terminal);
        true
    }

    fn subscriber_count(&mut self) -> usize {
        self.subscribers.retain(|tx| !tx.is_closed());
        self.subscribers.len()
    }
}

macro_rules! subject_common {
    ($name:ident) => {
        impl<T: Clone> $name<T> {
            /// Attach a new subscriber
            pub fn subscribe(&self) -> Subscription<T> {
                self.hub.lock().subscribe()
            }

            /// Publish a value; returns false if the subject has terminated
            pub fn next(&self, value: T) -> bool {
                self.hub.lock().next(value)
            }

            /// Terminate with an error notification
            ///
            /// Returns false if the subject had already terminated.
            pub fn error(&self, error: impl Into<StreamError>) -> bool {
                self.hub.lock().terminate(Terminal::Errored(error.into()))
            }

            /// Terminate without error
            ///
            /// Returns false if the subject had already terminated.
            pub fn complete(&self) -> bool {
                self.hub.lock().terminate(Terminal::Completed)
            }

            /// True once the subject has errored or completed
            pub fn is_terminated(&self) -> bool {
                self.hub.lock().terminal.is_some()
            }

            /// Number of live subscribers
            pub fn subscriber_count(&self) -> usize {
                self.hub.lock().subscriber_count()
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    hub: Arc::clone(&self.hub),
                }
            }
        }
    };
}

/// Fire-and-forget multicast subject
#[derive(Debug)]
pub struct Subject<T> {
    hub: Arc<Mutex<Hub<T>>>,
}

impl<T: Clone> Subject<T> {
    /// Create a subject without replay
    pub fn new() -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub::new(false))),
        }
    }
}

impl<T: Clone> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

subject_common!(Subject);

/// Multicast subject replaying the latest value to late subscribers
#[derive(Debug)]
pub struct ReplaySubject<T> {
    hub: Arc<Mutex<Hub<T>>>,
}

impl<T: Clone> ReplaySubject<T> {
    /// Create a subject with a replay buffer of one
    pub fn new() -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub::new(true))),
        }
    }

    /// The most recently published value
    pub fn latest(&self) -> Option<T> {
        self.hub.lock().latest.clone()
    }
}

impl<T: Clone> Default for ReplaySubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

subject_common!(ReplaySubject);

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_subject_no_replay() {
        let subject = Subject::new();
        subject.next(1);

        let mut sub = subject.subscribe();
        assert!(sub.try_recv().is_none());

        subject.next(2);
        assert_eq!(sub.try_recv(), Some(Ok(2)));
    }

    #[test]
    fn test_replay_subject_latest_only() {
        let subject = ReplaySubject::new();
        let mut early = subject.subscribe();
        assert!(early.try_recv().is_none());

        subject.next(1);
        subject.next(2);
        subject.next(3);

        let mut late = subject.subscribe();
        assert_eq!(late.try_recv(), Some(Ok(3)));
        assert!(late.try_recv().is_none());

        assert_eq!(early.try_recv(), Some(Ok(1)));
        assert_eq!(early.try_recv(), Some(Ok(2)));
        assert_eq!(early.try_recv(), Some(Ok(3)));
        assert_eq!(subject.latest(), Some(3));
    }

    #[tokio::test]
    async fn test_error_terminates_stream() {
        let subject = Subject::new();
        let mut sub = subject.subscribe();

        subject.next("a");
        assert!(subject.error(TransportError::ConnectionClosed));
        assert!(!subject.next("b"));
        assert!(!subject.error(TransportError::ConnectionClosed));

        assert_eq!(sub.recv().await, Some(Ok("a")));
        assert_eq!(
            sub.recv().await,
            Some(Err(StreamError::Transport(TransportError::ConnectionClosed)))
        );
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_late_subscriber_after_error() {
        let subject = ReplaySubject::new();
        subject.next(7);
        subject.error(TransportError::ConnectionClosed);

        let items: Vec<_> = subject.subscribe().collect().await;
        assert_eq!(
            items,
            vec![
                Ok(7),
                Err(StreamError::Transport(TransportError::ConnectionClosed))
            ]
        );
    }

    #[tokio::test]
    async fn test_complete_ends_streams() {
        let subject = ReplaySubject::new();
        let mut sub = subject.subscribe();
        subject.next(1);
        assert!(subject.complete());
        assert!(subject.is_terminated());

        assert_eq!(sub.recv().await, Some(Ok(1)));
        assert_eq!(sub.recv().await, None);

        let late: Vec<_> = subject.subscribe().collect().await;
        assert_eq!(late, vec![Ok(1)]);
    }

    #[test]
    fn test_dropped_subscribers_pruned() {
        let subject = Subject::new();
        let sub = subject.subscribe();
        let _keep = subject.subscribe();
        assert_eq!(subject.subscriber_count(), 2);

        drop(sub);
        subject.next(1);
        assert_eq!(subject.subscriber_count(), 1);
    }
}
