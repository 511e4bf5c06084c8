//! Common test utilities for stream integration tests.

#![allow(dead_code)]

pub mod mock_transport;

use std::time::Duration;

use tokio::sync::watch;

use leilao_lib::stream::{ConnectionState, EventStreamClient};

pub use mock_transport::MockStreamTransport;

/// Wait until the client reports `expected`.
pub async fn wait_for_state(client: &EventStreamClient, expected: ConnectionState) {
    let mut rx: watch::Receiver<ConnectionState> = client.watch_state();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == expected))
        .await
        .expect("timed out waiting for connection state")
        .expect("state channel closed");
}
