//! Real-time order synchronization for restaurant displays.
//!
//! Keeps a kitchen board, an online orders panel or a single-order tracker
//! in sync with the order service by combining a push channel (new-order
//! notifications over WebSocket, with liveness probing and bounded
//! reconnects) with periodic REST snapshots, merged into one ordered
//! collection per restaurant.

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod sync;
pub mod tls;
pub mod tui;
pub mod websocket;

pub use error::{ExpoError, Result};
