//! Push notifications delivered over the order channel.
//!
//! Events are not authoritative for order content. They carry just enough
//! to show a banner immediately and to trigger a reconciliation fetch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::{Order, OrderId, kind_or_default};
use super::status::{OrderKind, OrderStatus};
use super::timestamp;

/// Event discriminator (`event` field on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// `order.created`
    OrderCreated,
    /// Any event name this client does not act on yet.
    Other(String),
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "order.created" => EventKind::OrderCreated,
            _ => EventKind::Other(name),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::OrderCreated => "order.created".to_string(),
            EventKind::Other(name) => name,
        }
    }
}

/// A partial order projection pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    #[serde(rename = "event")]
    pub kind: EventKind,
    /// Missing when the publisher could not resolve the new order's id.
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub restaurant_id: Option<String>,
    #[serde(rename = "order_type", default, deserialize_with = "kind_or_default")]
    pub order_kind: OrderKind,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the publisher emitted the event.
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl OrderEvent {
    /// Builds a pending order with no line items from the event, for
    /// immediate display until a snapshot supplies the full record.
    ///
    /// Returns `None` when the event carries no order id.
    pub fn to_partial_order(&self, received_at: DateTime<Utc>) -> Option<Order> {
        let id = self.order_id.clone()?;
        Some(Order {
            id,
            order_number: self.order_number.clone(),
            status: OrderStatus::Pending,
            kind: self.order_kind,
            created_at: self.created_at.or(self.timestamp).unwrap_or(received_at),
            customer_name: self.customer_name.clone(),
            items: Vec::new(),
            total: self.total.unwrap_or_default(),
            delivery_address: self.delivery_address.clone(),
            special_instructions: None,
            table_id: None,
        })
    }
}

impl From<&Order> for OrderEvent {
    /// Describes an order found by a snapshot as if it had been pushed, so
    /// a missed notification still gets a banner.
    fn from(order: &Order) -> Self {
        Self {
            kind: EventKind::OrderCreated,
            order_id: Some(order.id.clone()),
            order_number: order.order_number.clone(),
            restaurant_id: None,
            order_kind: order.kind,
            customer_name: order.customer_name.clone(),
            total: Some(order.total),
            delivery_address: order.delivery_address.clone(),
            created_at: Some(order.created_at),
            timestamp: None,
        }
    }
}
