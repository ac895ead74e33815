//! Order records as returned by the order service.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::status::{OrderKind, OrderStatus};
use super::timestamp;

/// Opaque order identifier (a UUID string on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A full order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(rename = "order_type", default, deserialize_with = "kind_or_default")]
    pub kind: OrderKind,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub table_id: Option<String>,
}

/// A single line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: String,
    #[serde(rename = "menu_item_name", alias = "item_name", default)]
    pub name: String,
    pub quantity: u32,
    #[serde(alias = "item_price")]
    pub unit_price: Decimal,
    /// Customer request for this line (`special_requests` on the wire).
    #[serde(rename = "special_requests", alias = "special_instructions", default)]
    pub note: Option<String>,
}

impl OrderItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl Order {
    /// Sum of the line subtotals, before tax.
    pub fn line_total(&self) -> Decimal {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    /// Name to show on a ticket, falling back to the order number.
    pub fn display_name(&self) -> &str {
        self.customer_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.order_number)
    }
}

/// Treats a `null` or unrecognised order type like a missing one, so a
/// new backend order type never breaks a whole snapshot.
pub(crate) fn kind_or_default<'de, D>(deserializer: D) -> Result<OrderKind, D::Error>
where
    D: Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name
        .as_deref()
        .and_then(OrderKind::from_wire)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BACKEND_ORDER: &str = r#"{
        "id": "0b6f0c1e-6a43-4b55-9d2a-1f7c2b1a9e01",
        "restaurant_id": "r-1",
        "table_id": "t-7",
        "order_number": "ORD-20250301-0042",
        "status": "preparing",
        "customer_name": "Ana",
        "customer_phone": null,
        "subtotal": 23.0,
        "tax": 1.84,
        "total": 24.84,
        "special_instructions": null,
        "items": [
            {
                "id": "i-1",
                "order_id": "0b6f0c1e-6a43-4b55-9d2a-1f7c2b1a9e01",
                "menu_item_id": "m-1",
                "menu_item_name": "Margherita",
                "unit_price": 11.5,
                "quantity": 2,
                "subtotal": 23.0,
                "status": "preparing",
                "special_requests": "extra basil",
                "contributor_name": null,
                "created_at": "2025-03-01T18:30:00",
                "updated_at": "2025-03-01T18:30:00"
            }
        ],
        "created_at": "2025-03-01T18:30:00.123456",
        "updated_at": "2025-03-01T18:31:00",
        "completed_at": null
    }"#;

    #[test]
    fn deserializes_backend_order() {
        let order: Order = serde_json::from_str(BACKEND_ORDER).unwrap();
        assert_eq!(order.id.as_str(), "0b6f0c1e-6a43-4b55-9d2a-1f7c2b1a9e01");
        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.kind, OrderKind::DineIn);
        assert_eq!(order.total, dec!(24.84));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].name, "Margherita");
        assert_eq!(order.items[0].note.as_deref(), Some("extra basil"));
        assert_eq!(order.line_total(), dec!(23.0));
    }

    #[test]
    fn null_order_type_is_dine_in() {
        let json = r#"{"id":"a","order_number":"1","status":"pending",
            "order_type":null,"created_at":"2025-03-01T18:30:00"}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.kind, OrderKind::DineIn);
        assert!(order.items.is_empty());
    }

    #[test]
    fn unknown_order_type_is_dine_in() {
        let json = r#"{"id":"a","order_number":"1","status":"pending",
            "order_type":"PICKUP","created_at":"2025-03-01T18:30:00"}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.kind, OrderKind::DineIn);
    }

    #[test]
    fn display_name_falls_back_to_number() {
        let json = r#"{"id":"a","order_number":"ORD-7","status":"pending",
            "customer_name":"","created_at":"2025-03-01T18:30:00"}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.display_name(), "ORD-7");
    }
}
