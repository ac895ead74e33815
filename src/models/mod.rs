//! Shared models for the order service.
//!
//! Contains order records and their lifecycle, push event payloads, and
//! the small request/response bodies exchanged with the backend.

pub mod event;
pub mod order;
pub mod status;
pub mod timestamp;

use serde::{Deserialize, Serialize};

pub use event::{EventKind, OrderEvent};
pub use order::{Order, OrderId, OrderItem};
pub use status::{LIFECYCLE, OrderKind, OrderStatus};

/// Text frame sent as a liveness probe. The server answers with
/// `{"type": "pong"}`.
pub const PING_PROBE: &str = "ping";

/// Body of a `PATCH /orders/{id}/status` request.
#[derive(Debug, Serialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// Plain acknowledgement returned by the cancel endpoint.
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body returned by the backend on 4xx/5xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    /// Flattens `detail`, which is a string for domain errors and a list
    /// of field errors for validation failures.
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Informational greeting sent once after the socket is accepted.
#[derive(Debug, Deserialize)]
pub struct ConnectionAck {
    #[serde(default)]
    pub message: Option<String>,
}
