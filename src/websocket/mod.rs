//! Order channel: one WebSocket per restaurant subscription.
//!
//! This module is organized by concern:
//! - [`handler`] - Incoming message classification
//! - [`channel`] - A single live connection with liveness probing
//! - [`supervisor`] - Reconnection policy and connection state

pub mod channel;
pub mod handler;
pub mod supervisor;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use tracing::{debug, info};
use tungstenite::Message;

use crate::Result;
use crate::models::PING_PROBE;

pub use channel::{ChannelCommand, CloseOutcome, HeartbeatChannel, NORMAL_CLOSURE};
pub use handler::{ServerMessage, parse_message};
pub use supervisor::{
    ConnectionState, RetryBudget, RetryDecision, Supervisor, SupervisorCommand, SupervisorHandle,
};

/// Write half of an order channel connection.
pub type WsWriter<S> = SplitSink<WebSocketStream<S>, Message>;

/// Opens the raw WebSocket for a restaurant.
///
/// Production code uses [`WsDialer`]; tests substitute in-memory streams.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connects and completes the WebSocket handshake.
    async fn dial(&self, restaurant_id: &str) -> Result<WebSocketStream<Self::Stream>>;
}

/// Dials `{base_url}/{restaurant_id}` over TCP, with TLS for `wss://`.
#[derive(Clone)]
pub struct WsDialer {
    base_url: String,
    tls_config: Option<Arc<rustls::ClientConfig>>,
}

impl WsDialer {
    /// Creates a dialer. `tls_config` pins the trusted roots for `wss://`
    /// endpoints; `None` uses the bundled webpki roots.
    #[must_use]
    pub fn new(base_url: impl Into<String>, tls_config: Option<Arc<rustls::ClientConfig>>) -> Self {
        Self {
            base_url: base_url.into(),
            tls_config,
        }
    }

    /// Returns the channel URL for a restaurant.
    pub fn channel_url(&self, restaurant_id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), restaurant_id)
    }
}

#[async_trait]
impl Dialer for WsDialer {
    type Stream = MaybeTlsStream<TcpStream>;

    async fn dial(&self, restaurant_id: &str) -> Result<WebSocketStream<Self::Stream>> {
        let url = self.channel_url(restaurant_id);
        let connector = self.tls_config.clone().map(Connector::Rustls);

        let (ws_stream, _) = connect_async_tls_with_config(url.as_str(), None, false, connector).await?;
        info!(url = %url, "WebSocket handshake completed");

        Ok(ws_stream)
    }
}

/// Frames that may wait for the writer task beyond the one being written.
const OUTGOING_CAPACITY: usize = 1;

/// Moves the write half onto its own task.
///
/// A peer that stops reading stalls only this task; the read loop keeps
/// running and can still time out or close.
pub fn spawn_writer<S>(mut write: WsWriter<S>, restaurant_id: String) -> (mpsc::Sender<Message>, JoinHandle<()>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Message>(OUTGOING_CAPACITY);
    let handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write.send(msg).await {
                debug!(restaurant_id = %restaurant_id, error = %e, "Write failed");
                break;
            }
        }
    });
    (tx, handle)
}

/// Queues a liveness probe without waiting for it to be written.
///
/// Returns `false` when the probe was skipped because earlier frames are
/// still queued or the writer has stopped.
pub fn ping(outgoing: &mpsc::Sender<Message>) -> bool {
    match outgoing.try_send(Message::Text(PING_PROBE.into())) {
        Ok(()) => {
            debug!("Queued ping");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_url_appends_restaurant_id() {
        let dialer = WsDialer::new("ws://localhost:8004/ws/orders/", None);
        assert_eq!(
            dialer.channel_url("r-42"),
            "ws://localhost:8004/ws/orders/r-42"
        );
    }
}
