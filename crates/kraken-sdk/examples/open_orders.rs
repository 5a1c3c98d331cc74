//! Track open orders from a recorded private channel session
//!
//! Run with: cargo run --example open_orders
//!
//! Set `RUST_LOG=debug` to see skipped frames and stale updates.

use async_trait::async_trait;
use futures::stream::{self, Iter};
use kraken_sdk::prelude::*;
use std::time::Duration;
use std::vec::IntoIter;
use tracing_subscriber::EnvFilter;

type Frames = Iter<IntoIter<Result<String, TransportError>>>;

/// Replays a fixed list of frames, as a socket layer would deliver them
struct Replay(Vec<&'static str>);

#[async_trait]
impl ChannelConnector for Replay {
    type Channel = FrameChannel<Frames>;

    async fn connect(
        &self,
        channel_name: &str,
        auth: ChannelAuth,
    ) -> Result<Self::Channel, TransportError> {
        println!(
            "Subscribing to {} ({})",
            channel_name,
            if auth.token().is_some() { "token" } else { "credentials" }
        );
        let frames: Vec<_> = self.0.iter().map(|f| Ok(f.to_string())).collect();
        Ok(FrameChannel::new(stream::iter(frames)))
    }
}

const SESSION: &[&str] = &[
    r#"{"event": "subscriptionStatus", "status": "subscribed", "channelName": "openOrders"}"#,
    r#"[[{"OQCLML-BW3P3-BUCMWZ": {"status": "pending", "vol": "1.25", "vol_exec": "0"}},
        {"OB5VMB-B4U2U-DK2WRW": {"status": "open", "vol": "0.5", "vol_exec": "0"}}],
       "openOrders", {"sequence": 1}]"#,
    r#"{"event": "heartbeat"}"#,
    r#"[[{"OQCLML-BW3P3-BUCMWZ": {"status": "open"}}], "openOrders", {"sequence": 2}]"#,
    r#"[[{"OB5VMB-B4U2U-DK2WRW": {"vol_exec": "0.5", "avg_price": "30010.1", "status": "closed"}}],
       "openOrders", {"sequence": 3}]"#,
    r#"[[{"OQCLML-BW3P3-BUCMWZ": {"status": "canceled", "cancel_reason": "User requested"}}],
       "openOrders", {"sequence": 4}]"#,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kraken_ws=info".parse()?))
        .init();

    let orders = OpenOrdersBuilder::new()
        .with_env_defaults()
        .with_token("replayed-session-token")
        .connect(&Replay(SESSION.to_vec()))
        .await?;

    let mut opened = orders.opened();
    let mut closed = orders.closed();
    let mut snapshots = orders.snapshots();

    let timeout = tokio::time::sleep(Duration::from_secs(5));
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            _ = &mut timeout => {
                println!("Timeout reached. Shutting down...");
                break;
            }
            Some(Ok(order)) = opened.recv() => {
                println!("+ {} {:?}", order.order_id(), order.status());
            }
            Some(Ok(order)) = closed.recv() => {
                println!(
                    "- {} {:?} price={:?} reason={:?}",
                    order.order_id(),
                    order.status(),
                    order.price(),
                    order.reason()
                );
            }
            event = snapshots.recv() => match event {
                Some(Ok(open)) => println!("  {} open", open.len()),
                Some(Err(e)) => {
                    println!("Channel failed: {}", e);
                    break;
                }
                None => {
                    println!("Session ended");
                    break;
                }
            },
        }
    }

    println!("Stats: {:?}", orders.stats());
    orders.teardown().await;
    Ok(())
}
