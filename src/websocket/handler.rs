//! Incoming order channel message classification.

use tracing::debug;

use crate::Result;
use crate::models::{ConnectionAck, EventKind, OrderEvent};

/// A decoded server frame.
#[derive(Debug)]
pub enum ServerMessage {
    /// Greeting sent right after the socket is accepted. Informational.
    ConnectionAck(Option<String>),
    /// Reply to a liveness probe. Informational.
    LivenessAck,
    /// A new order was placed.
    OrderCreated(OrderEvent),
    /// Well-formed but not something this client acts on.
    Ignored,
}

/// Parses a text frame from the order channel.
///
/// Routing follows the server's conventions: control messages carry a
/// `type` field, notifications carry an `event` field.
///
/// # Errors
///
/// Returns [`ExpoError::Json`](crate::ExpoError::Json) if the frame is not
/// JSON or an `order.created` payload does not have the expected shape.
pub fn parse_message(text: &str) -> Result<ServerMessage> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    if let Some(msg_type) = value.get("type").and_then(|t| t.as_str()) {
        return Ok(match msg_type {
            "connection" => {
                let ack: ConnectionAck = serde_json::from_value(value)?;
                ServerMessage::ConnectionAck(ack.message)
            }
            "pong" => ServerMessage::LivenessAck,
            other => {
                debug!(msg_type = other, "Ignoring control message");
                ServerMessage::Ignored
            }
        });
    }

    if value.get("event").is_some() {
        let event: OrderEvent = serde_json::from_value(value)?;
        return Ok(match event.kind {
            EventKind::OrderCreated => ServerMessage::OrderCreated(event),
            EventKind::Other(ref name) => {
                debug!(event = %name, "Ignoring event");
                ServerMessage::Ignored
            }
        });
    }

    Ok(ServerMessage::Ignored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_greeting_is_acknowledged() {
        let msg = parse_message(r#"{"type":"connection","message":"Connected to restaurant r-1"}"#)
            .unwrap();
        assert!(matches!(
            msg,
            ServerMessage::ConnectionAck(Some(ref m)) if m == "Connected to restaurant r-1"
        ));
    }

    #[test]
    fn pong_is_liveness_ack() {
        let msg = parse_message(r#"{"type":"pong"}"#).unwrap();
        assert!(matches!(msg, ServerMessage::LivenessAck));
    }

    #[test]
    fn order_created_is_forwarded() {
        let msg = parse_message(
            r#"{"event":"order.created","order_id":"o-9","order_number":"42","order_type":"DELIVERY"}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::OrderCreated(event) => {
                assert_eq!(event.order_number, "42");
                assert!(event.order_kind.is_online());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_events_are_ignored() {
        let msg = parse_message(r#"{"event":"order.updated","order_id":"o-9"}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Ignored));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_message("pong").is_err());
        assert!(parse_message("{\"event\":").is_err());
    }

    #[test]
    fn wrongly_typed_event_is_an_error() {
        let result = parse_message(r#"{"event":"order.created","order_id":"o-1","total":"lots"}"#);
        assert!(result.is_err());
    }
}
