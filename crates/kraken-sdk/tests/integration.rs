//! Integration tests for the open orders SDK
//!
//! Covers the full flow: builder and auth resolution, a connector handing
//! out a channel, frame decoding and the three event streams.

mod common;

use common::*;
use kraken_auth::{AuthError, Credentials};
use kraken_sdk::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

fn creds(api_key: &str) -> Credentials {
    Credentials::new(api_key, "dGVzdF9wcml2YXRlX2tleQ==").unwrap()
}

// =============================================================================
// Auth Resolution Tests
// =============================================================================

#[tokio::test]
async fn test_token_wins_over_credentials() {
    let (connector, _controller) = MockConnector::new();

    let orders = OpenOrdersBuilder::new()
        .with_token("ws-token")
        .with_credentials(creds("explicit"))
        .with_default_credentials(creds("default"))
        .connect(&connector)
        .await
        .unwrap();

    assert_eq!(
        connector.seen(),
        vec![("openOrders".to_string(), SeenAuth::Token("ws-token".into()))]
    );
    orders.teardown().await;
}

#[tokio::test]
async fn test_explicit_credentials_win_over_default() {
    let (connector, _controller) = MockConnector::new();

    let orders = OpenOrdersBuilder::new()
        .with_credentials(creds("explicit"))
        .with_default_credentials(creds("default"))
        .connect(&connector)
        .await
        .unwrap();

    assert_eq!(connector.seen()[0].1, SeenAuth::Credentials("explicit".into()));
    orders.teardown().await;
}

#[tokio::test]
async fn test_default_credentials_used_last() {
    let (connector, _controller) = MockConnector::new();

    let orders = OpenOrdersBuilder::new()
        .with_default_credentials(creds("default"))
        .connect(&connector)
        .await
        .unwrap();

    assert_eq!(connector.seen()[0].1, SeenAuth::Credentials("default".into()));
    orders.teardown().await;
}

#[tokio::test]
async fn test_missing_auth_never_connects() {
    let (connector, _controller) = MockConnector::new();

    let err = OpenOrdersBuilder::new().connect(&connector).await.unwrap_err();

    assert_eq!(err, SetupError::Auth(AuthError::MissingAuth));
    assert!(connector.seen().is_empty());
}

// =============================================================================
// Setup Failure Tests
// =============================================================================

#[tokio::test]
async fn test_invalid_config_rejected() {
    let (connector, _controller) = MockConnector::new();

    let err = OpenOrdersBuilder::new()
        .with_token("ws-token")
        .with_channel_name("")
        .connect(&connector)
        .await
        .unwrap_err();

    assert_eq!(err, SetupError::Config(ConfigError::EmptyChannelName));
    assert!(connector.seen().is_empty());
}

#[tokio::test]
async fn test_connect_failure() {
    let (connector, _controller) = MockConnector::new();
    let connector = connector.failing(TransportError::AuthFailed("invalid token".into()));

    let err = OpenOrdersBuilder::new()
        .with_token("ws-token")
        .connect(&connector)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SetupError::Transport(TransportError::AuthFailed("invalid token".into()))
    );
}

#[tokio::test]
async fn test_connect_timeout() {
    let (connector, _controller) = MockConnector::new();
    let connector = connector.with_delay(Duration::from_secs(30));

    let err = OpenOrdersBuilder::new()
        .with_token("ws-token")
        .with_connect_timeout(Duration::from_secs(1))
        .connect(&connector)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SetupError::Transport(TransportError::Timeout(Duration::from_secs(1)))
    );
}

// =============================================================================
// Frame Flow Tests
// =============================================================================

#[tokio::test]
async fn test_order_lifecycle_from_frames() {
    let (connector, tx) = FrameConnector::new();
    let orders = OpenOrdersBuilder::new()
        .with_token("ws-token")
        .connect(&connector)
        .await
        .unwrap();

    let mut opened = orders.opened();
    let mut closed = orders.closed();
    let mut snapshots = orders.snapshots();

    send(&tx, HEARTBEAT_FRAME);
    send(&tx, INITIAL_FRAME);
    send(&tx, OPEN_FRAME);
    send(&tx, CANCEL_FRAME);
    send(&tx, STALE_FRAME);

    let first = opened.recv().await.unwrap().unwrap();
    assert_eq!(first.order_id(), "OQCLML-BW3P3-BUCMWZ");
    assert_eq!(first.status(), Some(OrderStatus::Pending));

    let last = closed.recv().await.unwrap().unwrap();
    assert_eq!(last.status(), Some(OrderStatus::Canceled));
    assert_eq!(last.price(), Some(Decimal::from_str("29999.5").unwrap()));
    assert_eq!(last.reason(), Some("User requested"));
    assert_eq!(last.volume(), Some(Decimal::from_str("1.25").unwrap()));
    assert_eq!(last.volume_executed(), Some(Decimal::from_str("0.50").unwrap()));

    // One snapshot per channel batch; the heartbeat produces none
    let mut lens = Vec::new();
    for _ in 0..4 {
        lens.push(snapshots.recv().await.unwrap().unwrap().len());
    }
    assert_eq!(lens, vec![1, 1, 0, 0]);

    assert!(orders.is_closed("OQCLML-BW3P3-BUCMWZ"));
    assert!(orders.open_orders().is_empty());

    let stats = orders.stats();
    assert_eq!(stats.batches, 4);
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.closed, 1);
    assert_eq!(stats.stale, 1);

    orders.teardown().await;
    assert!(opened.recv().await.is_none());
}

#[tokio::test]
async fn test_transport_error_reaches_every_stream() {
    let (connector, tx) = FrameConnector::new();
    let orders = OpenOrdersBuilder::new()
        .with_token("ws-token")
        .connect(&connector)
        .await
        .unwrap();

    send(&tx, INITIAL_FRAME);
    let open = open_orders(&orders, WAIT).await.unwrap();
    assert_eq!(open.len(), 1);

    let mut opened = orders.opened();
    let mut closed = orders.closed();
    let mut snapshots = orders.snapshots();
    // Replayed value first
    assert_eq!(snapshots.recv().await.unwrap().unwrap().len(), 1);

    tx.unbounded_send(Err(TransportError::ConnectionClosed)).unwrap();

    let expected = StreamError::Transport(TransportError::ConnectionClosed);
    assert_eq!(opened.recv().await, Some(Err(expected.clone())));
    assert_eq!(closed.recv().await, Some(Err(expected.clone())));
    assert_eq!(snapshots.recv().await, Some(Err(expected)));
    assert_eq!(orders.stream_state(), StreamState::Failed);

    // State stays as it was before the failure
    assert_eq!(orders.open_orders().len(), 1);
    orders.teardown().await;
}

#[tokio::test]
async fn test_late_subscriber_gets_latest_snapshot() {
    let (connector, tx) = FrameConnector::new();
    let orders = OpenOrdersBuilder::new()
        .with_token("ws-token")
        .connect(&connector)
        .await
        .unwrap();

    let mut early = orders.snapshots();
    send(&tx, INITIAL_FRAME);
    send(&tx, CANCEL_FRAME);
    while let Some(Ok(open)) = early.recv().await {
        if open.is_empty() {
            break;
        }
    }

    let mut late = orders.snapshots();
    assert_eq!(late.recv().await, Some(Ok(Vec::new())));
    assert!(late.try_recv().is_none());

    orders.teardown().await;
}

#[tokio::test]
async fn test_wait_for_close_through_sdk() {
    let (connector, tx) = FrameConnector::new();
    let orders = OpenOrdersBuilder::new()
        .with_token("ws-token")
        .connect(&connector)
        .await
        .unwrap();

    send(&tx, INITIAL_FRAME);
    open_orders(&orders, WAIT).await.unwrap();

    let (result, _) = tokio::join!(
        wait_for_close(&orders, "OQCLML-BW3P3-BUCMWZ", WAIT),
        async { send(&tx, CANCEL_FRAME) }
    );

    let last = result.unwrap();
    assert_eq!(last.reason(), Some("User requested"));
    orders.teardown().await;
}
