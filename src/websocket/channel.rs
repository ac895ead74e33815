//! A single live order channel connection.
//!
//! [`HeartbeatChannel`] owns one WebSocket. While it runs it forwards
//! `order.created` notifications, probes liveness on a fixed interval and
//! reports how the connection ended so the supervisor can decide whether
//! to reconnect.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};
use tungstenite::Message;
use tungstenite::protocol::CloseFrame;
use tungstenite::protocol::frame::coding::CloseCode;

use super::handler::{ServerMessage, parse_message};
use super::{Dialer, ping, spawn_writer};
use crate::config::SyncSettings;
use crate::models::OrderEvent;
use crate::{ExpoError, Result};

/// Close code reserved for intentional closes. Any other code, or a
/// connection that drops without a close frame, is abnormal.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Code reported when the connection ended without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

/// Upper bound on a local close: queueing the close frame, flushing it and
/// waiting for the peer's echo all share this deadline.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Requests sent to a running channel by its owner.
#[derive(Debug)]
pub enum ChannelCommand {
    /// Close the connection with the given code and reason.
    Close { code: u16, reason: String },
}

/// How a channel ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOutcome {
    /// Close code from the close frame, [`ABNORMAL_CLOSURE`] when the
    /// connection dropped without one.
    pub code: u16,
    pub reason: String,
}

impl CloseOutcome {
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: ABNORMAL_CLOSURE,
            reason: reason.into(),
        }
    }

    /// Only a normal-closure code counts as intentional, whichever side
    /// sent it.
    pub fn is_intentional(&self) -> bool {
        self.code == NORMAL_CLOSURE
    }
}

/// Why the read loop stopped.
enum Ending {
    /// The connection ended on its own; no close handshake is needed.
    Remote(CloseOutcome),
    /// We close with this code and reason.
    Local(u16, String),
}

/// One open order channel for a restaurant.
pub struct HeartbeatChannel<S> {
    restaurant_id: String,
    ws: WebSocketStream<S>,
    ping_interval: Duration,
    silence_timeout: Option<Duration>,
}

impl<S> HeartbeatChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Dials the channel for `restaurant_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ExpoError::MissingSubscriberKey`] without dialing if the id
    /// is blank, or the dialer's error if the handshake fails.
    pub async fn open<D>(dialer: &D, restaurant_id: &str, settings: &SyncSettings) -> Result<Self>
    where
        D: Dialer<Stream = S> + ?Sized,
    {
        let restaurant_id = restaurant_id.trim();
        if restaurant_id.is_empty() {
            return Err(ExpoError::MissingSubscriberKey);
        }

        let ws = dialer.dial(restaurant_id).await?;

        Ok(Self {
            restaurant_id: restaurant_id.to_string(),
            ws,
            ping_interval: settings.ping_interval,
            silence_timeout: settings.silence_timeout,
        })
    }

    /// Runs the connection until it closes.
    ///
    /// `order.created` notifications are converted with `T::from` and sent
    /// to `events`. Malformed frames are logged and dropped. If `events`
    /// is closed the subscriber is gone and the channel closes itself
    /// normally.
    pub async fn run<T>(
        self,
        events: &mpsc::UnboundedSender<T>,
        commands: &mut mpsc::UnboundedReceiver<ChannelCommand>,
    ) -> CloseOutcome
    where
        T: From<OrderEvent>,
    {
        let restaurant_id = self.restaurant_id;
        let (write, mut read) = self.ws.split();
        let (outgoing, mut writer) = spawn_writer(write, restaurant_id.clone());

        let mut probe = tokio::time::interval_at(
            Instant::now() + self.ping_interval,
            self.ping_interval,
        );
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let silence_limit = self.silence_timeout.unwrap_or(Duration::MAX);
        let silence = tokio::time::sleep(silence_limit);
        tokio::pin!(silence);

        let ending = loop {
            tokio::select! {
                msg = read.next() => {
                    if let Some(limit) = self.silence_timeout {
                        silence.as_mut().reset(Instant::now() + limit);
                    }

                    match msg {
                        Some(Ok(Message::Text(text))) => match parse_message(&text) {
                            Ok(ServerMessage::OrderCreated(event)) => {
                                info!(
                                    restaurant_id = %restaurant_id,
                                    order_number = %event.order_number,
                                    "New order notification"
                                );
                                if events.send(T::from(event)).is_err() {
                                    break Ending::Local(NORMAL_CLOSURE, "subscriber gone".to_string());
                                }
                            }
                            Ok(ServerMessage::ConnectionAck(message)) => {
                                info!(restaurant_id = %restaurant_id, message = ?message, "Connection confirmed");
                            }
                            Ok(ServerMessage::LivenessAck) => debug!("Pong received"),
                            Ok(ServerMessage::Ignored) => {}
                            Err(e) => {
                                warn!(restaurant_id = %restaurant_id, error = %e, "Dropping malformed message");
                            }
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let outcome = match frame {
                                Some(frame) => CloseOutcome {
                                    code: u16::from(frame.code),
                                    reason: frame.reason.to_string(),
                                },
                                None => CloseOutcome {
                                    code: ABNORMAL_CLOSURE,
                                    reason: "close frame without status".to_string(),
                                },
                            };
                            info!(
                                restaurant_id = %restaurant_id,
                                code = outcome.code,
                                reason = %outcome.reason,
                                "Order channel closed by server"
                            );
                            break Ending::Remote(outcome);
                        }
                        Some(Ok(_)) => {} // Binary/Ping/Pong frames
                        Some(Err(e)) => {
                            warn!(restaurant_id = %restaurant_id, error = %e, "WebSocket error");
                            break Ending::Remote(CloseOutcome::abnormal(e.to_string()));
                        }
                        None => {
                            warn!(restaurant_id = %restaurant_id, "WebSocket stream ended");
                            break Ending::Remote(CloseOutcome::abnormal("stream ended"));
                        }
                    }
                }

                _ = probe.tick() => {
                    // Advisory only; a dead socket surfaces on the read side.
                    if !ping(&outgoing) {
                        debug!(restaurant_id = %restaurant_id, "Skipped liveness probe, writer busy");
                    }
                }

                () = &mut silence, if self.silence_timeout.is_some() => {
                    warn!(restaurant_id = %restaurant_id, "No traffic within silence timeout");
                    break Ending::Remote(CloseOutcome::abnormal("silence timeout"));
                }

                cmd = commands.recv() => {
                    match cmd {
                        Some(ChannelCommand::Close { code, reason }) => break Ending::Local(code, reason),
                        None => break Ending::Local(NORMAL_CLOSURE, "owner gone".to_string()),
                    }
                }
            }
        };

        let (code, reason) = match ending {
            Ending::Remote(outcome) => {
                writer.abort();
                return outcome;
            }
            Ending::Local(code, reason) => (code, reason),
        };

        let deadline = Instant::now() + CLOSE_GRACE;
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.clone().into(),
        };
        match tokio::time::timeout_at(deadline, outgoing.send(Message::Close(Some(frame)))).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) | Err(_) => {
                debug!(restaurant_id = %restaurant_id, "Close frame not queued");
            }
        }
        drop(outgoing);
        if tokio::time::timeout_at(deadline, &mut writer).await.is_err() {
            warn!(restaurant_id = %restaurant_id, "Peer not reading, dropping connection");
            writer.abort();
        }

        // Drain until the peer echoes the close or the deadline passes.
        let _ = tokio::time::timeout_at(deadline, async {
            while let Some(Ok(msg)) = read.next().await {
                if msg.is_close() {
                    break;
                }
            }
        })
        .await;

        info!(restaurant_id = %restaurant_id, code, reason = %reason, "Order channel closed");
        CloseOutcome { code, reason }
    }
}
