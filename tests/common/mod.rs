//! Shared test utilities: an in-memory order channel and a scripted backend.
#![allow(dead_code)]

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tungstenite::Message;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::{CloseFrame, Role};

use expo::backend::OrderBackend;
use expo::config::SyncSettings;
use expo::models::{Order, OrderId, OrderItem, OrderKind, OrderStatus};
use expo::websocket::Dialer;
use expo::{ExpoError, Result};

/// Server half of an accepted in-memory connection.
pub type ServerSocket = WebSocketStream<DuplexStream>;

/// Dialer backed by `tokio::io::duplex`. Each accepted dial hands the
/// server half to the test.
pub struct DuplexDialer {
    dials: AtomicUsize,
    refuse: AtomicBool,
    buffer: usize,
    accepted: mpsc::UnboundedSender<ServerSocket>,
}

impl DuplexDialer {
    /// A dialer that accepts, and the receiver of server sockets.
    pub fn accepting() -> (Self, mpsc::UnboundedReceiver<ServerSocket>) {
        Self::with_buffer(64 * 1024)
    }

    /// An accepting dialer whose pipes hold only `buffer` bytes, so a
    /// server that never reads stalls the client's writes.
    pub fn with_buffer(buffer: usize) -> (Self, mpsc::UnboundedReceiver<ServerSocket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dialer = Self {
            dials: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
            buffer,
            accepted: tx,
        };
        (dialer, rx)
    }

    /// A dialer whose every attempt is refused until [`set_refuse`] clears it.
    ///
    /// [`set_refuse`]: DuplexDialer::set_refuse
    pub fn refusing() -> (Self, mpsc::UnboundedReceiver<ServerSocket>) {
        let (dialer, rx) = Self::accepting();
        dialer.set_refuse(true);
        (dialer, rx)
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for DuplexDialer {
    type Stream = DuplexStream;

    async fn dial(&self, _restaurant_id: &str) -> Result<WebSocketStream<DuplexStream>> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ExpoError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        let (client, server) = tokio::io::duplex(self.buffer);
        let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server, Role::Server, None).await;
        let _ = self.accepted.send(server);
        Ok(client)
    }
}

/// Production timings with the silence check off, so long waits in
/// paused-time tests don't trip it.
pub fn quiet_settings() -> SyncSettings {
    SyncSettings {
        silence_timeout: None,
        ..SyncSettings::default()
    }
}

/// Sends a raw text frame from the server side.
pub async fn send_text(server: &mut ServerSocket, text: &str) {
    server
        .send(Message::text(text.to_string()))
        .await
        .expect("server send failed");
}

/// Sends a JSON text frame from the server side.
pub async fn send_json(server: &mut ServerSocket, value: serde_json::Value) {
    send_text(server, &value.to_string()).await;
}

/// Closes from the server side with `code`.
pub async fn close_with(server: &mut ServerSocket, code: u16, reason: &str) {
    server
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        })))
        .await
        .expect("server close failed");
}

/// Reads frames until the client's close frame, skipping liveness probes.
pub async fn expect_close(server: &mut ServerSocket) -> (u16, String) {
    while let Some(msg) = server.next().await {
        match msg.expect("server read failed") {
            Message::Close(Some(frame)) => return (u16::from(frame.code), frame.reason.as_str().to_string()),
            Message::Close(None) => return (1005, String::new()),
            _ => {}
        }
    }
    panic!("connection ended without a close frame");
}

/// An `order.created` notification.
pub fn created_event(order_id: &str, order_number: &str) -> serde_json::Value {
    serde_json::json!({
        "event": "order.created",
        "order_id": order_id,
        "order_number": order_number,
        "restaurant_id": "r-1",
        "order_type": "TABLE",
        "customer_name": "Ada",
        "total": 18.5,
        "created_at": "2025-03-01T12:00:00Z",
        "timestamp": "2025-03-01T12:00:01Z"
    })
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_740_830_400 + secs, 0)
        .single()
        .expect("valid timestamp")
}

/// A full order record with one line item.
pub fn order(id: &str, status: OrderStatus, kind: OrderKind, created_secs: i64) -> Order {
    Order {
        id: OrderId::from(id),
        order_number: format!("#{id}"),
        status,
        kind,
        created_at: at(created_secs),
        customer_name: Some("Ada".to_string()),
        items: vec![OrderItem {
            menu_item_id: "m-1".to_string(),
            name: "Margherita".to_string(),
            quantity: 1,
            unit_price: Decimal::new(1850, 2),
            note: None,
        }],
        total: Decimal::new(1850, 2),
        delivery_address: None,
        special_instructions: None,
        table_id: None,
    }
}

/// In-memory order service.
pub struct FakeBackend {
    orders: Mutex<Vec<Order>>,
    latency: Duration,
    fail_list: AtomicBool,
    list_calls: AtomicUsize,
    last_limit: AtomicU32,
    update_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(orders: Vec<Order>) -> Self {
        Self::with_latency(orders, Duration::ZERO)
    }

    /// Snapshot requests take `latency` to answer.
    pub fn with_latency(orders: Vec<Order>, latency: Duration) -> Self {
        Self {
            orders: Mutex::new(orders),
            latency,
            fail_list: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            last_limit: AtomicU32::new(0),
            update_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, order: Order) {
        self.orders.lock().unwrap().push(order);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> u32 {
        self.last_limit.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    fn set_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| ExpoError::NotFound(format!("order {id}")))?;
        order.status = status;
        Ok(order.clone())
    }
}

#[async_trait]
impl OrderBackend for FakeBackend {
    async fn list_orders(&self, _restaurant_id: &str, limit: u32) -> Result<Vec<Order>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ExpoError::Rejected("service unavailable".to_string()));
        }
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| &o.id == id)
            .cloned()
            .ok_or_else(|| ExpoError::NotFound(format!("order {id}")))
    }

    async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.set_status(id, status)
    }

    async fn cancel_order(&self, id: &OrderId) -> Result<()> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.set_status(id, OrderStatus::Cancelled).map(|_| ())
    }
}
