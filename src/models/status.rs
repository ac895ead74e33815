//! Order lifecycle and order kind.
//!
//! The workflow is strictly linear:
//! `pending → confirmed → preparing → ready → served → completed`, with
//! `cancelled` reachable from every non-terminal status. Nothing here does
//! I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order (wire format: lowercase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Served,
    Completed,
    Cancelled,
}

/// The forward workflow, in order. `Cancelled` is not part of it.
pub const LIFECYCLE: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::Served,
    OrderStatus::Completed,
];

impl OrderStatus {
    /// Returns the single allowed forward transition, or `None` when no
    /// action is available (terminal statuses).
    #[must_use]
    pub fn next_status(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Served),
            OrderStatus::Served => Some(OrderStatus::Completed),
            OrderStatus::Completed | OrderStatus::Cancelled => None,
        }
    }

    /// Returns `true` for `completed` and `cancelled`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns `true` if moving to `target` is a single forward step or a
    /// cancellation of a non-terminal order.
    #[must_use]
    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        if target == OrderStatus::Cancelled {
            return !self.is_terminal();
        }
        self.next_status() == Some(target)
    }

    /// Position in [`LIFECYCLE`], used for tracker timelines.
    #[must_use]
    pub fn lifecycle_index(self) -> Option<usize> {
        LIFECYCLE.iter().position(|s| *s == self)
    }

    /// Kitchen button text for advancing from this status.
    ///
    /// Only the statuses a kitchen acts on have a label; `served` orders
    /// leave the kitchen board.
    #[must_use]
    pub fn action_label(self) -> Option<&'static str> {
        match self {
            OrderStatus::Pending => Some("Confirm Order"),
            OrderStatus::Confirmed => Some("Start Preparing"),
            OrderStatus::Preparing => Some("Mark as Ready"),
            OrderStatus::Ready => Some("Mark as Served"),
            _ => None,
        }
    }

    /// Returns the wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the order reached the restaurant.
///
/// The backend calls table orders `TABLE` and marketplace orders `ONLINE`
/// or `UBER`; older records carry no type at all and are dine-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    #[default]
    #[serde(rename = "TABLE", alias = "DINE_IN")]
    DineIn,
    #[serde(rename = "TAKEOUT")]
    Takeout,
    #[serde(rename = "DELIVERY")]
    Delivery,
    #[serde(rename = "ONLINE", alias = "UBER")]
    Marketplace,
}

impl OrderKind {
    /// Maps a backend `order_type` onto a kind. Unknown names return `None`.
    pub fn from_wire(name: &str) -> Option<OrderKind> {
        match name {
            "TABLE" | "DINE_IN" => Some(OrderKind::DineIn),
            "TAKEOUT" => Some(OrderKind::Takeout),
            "DELIVERY" => Some(OrderKind::Delivery),
            "ONLINE" | "UBER" => Some(OrderKind::Marketplace),
            _ => None,
        }
    }

    /// Delivery and marketplace orders are pinned first and badged.
    #[must_use]
    pub fn is_online(self) -> bool {
        matches!(self, OrderKind::Delivery | OrderKind::Marketplace)
    }

    /// Short badge text for displays.
    pub fn label(self) -> &'static str {
        match self {
            OrderKind::DineIn => "TABLE",
            OrderKind::Takeout => "TAKEOUT",
            OrderKind::Delivery => "DELIVERY",
            OrderKind::Marketplace => "ONLINE",
        }
    }
}
