//! Crate-level error types.
//!
//! [`ExpoError`] unifies every error source (configuration, WebSocket,
//! HTTP, JSON, order workflow) behind a single enum so callers can match on
//! the variant they care about while still using the `?` operator for easy
//! propagation.

use crate::models::OrderStatus;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExpoError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum ExpoError {
    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// An HTTP request to the order backend failed at the transport level.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TLS configuration could not be built.
    #[error("tls error: {0}")]
    Tls(String),

    /// Reading a local file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A channel was opened without a restaurant id to subscribe to.
    #[error("cannot open order channel: subscriber key is empty")]
    MissingSubscriberKey,

    /// The requested status change is not allowed by the order workflow.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The order is already completed or cancelled.
    #[error("order is already {0}")]
    AlreadyTerminal(OrderStatus),

    /// The backend has no order with this id.
    #[error("order not found: {0}")]
    NotFound(String),

    /// The backend refused the request; carries its `detail` message.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The subscription was torn down before the request completed.
    #[error("subscription closed")]
    SubscriptionClosed,
}
