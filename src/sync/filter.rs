//! Which orders a view keeps.

use crate::models::{Order, OrderStatus};

/// Definition of an "active" order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFilter {
    /// Boards: everything not yet served, completed or cancelled.
    Aggregate,
    /// Single-order tracking: served orders stay visible since the guest
    /// can still ask for the receipt.
    Tracking,
    /// No status filtering.
    Any,
}

impl ActiveFilter {
    pub fn admits(self, status: OrderStatus) -> bool {
        match self {
            ActiveFilter::Aggregate => !matches!(
                status,
                OrderStatus::Served | OrderStatus::Completed | OrderStatus::Cancelled
            ),
            ActiveFilter::Tracking => !status.is_terminal(),
            ActiveFilter::Any => true,
        }
    }
}

/// Filter applied to every snapshot and upsert of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewFilter {
    pub active: ActiveFilter,
    /// Keep only delivery and marketplace orders.
    pub online_only: bool,
}

impl ViewFilter {
    pub fn admits(&self, order: &Order) -> bool {
        self.active.admits(order.status) && (!self.online_only || order.kind.is_online())
    }
}

/// How a subscription shapes its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    pub filter: ViewFilter,
    /// Sort online orders ahead of in-house ones.
    pub pin_online: bool,
}

impl ViewOptions {
    /// Kitchen display: active orders, online first.
    pub fn kitchen() -> Self {
        Self {
            filter: ViewFilter {
                active: ActiveFilter::Aggregate,
                online_only: false,
            },
            pin_online: true,
        }
    }

    /// Online orders panel. Keeps finished orders so the day's totals can
    /// be computed; the panel itself lists only the active ones.
    pub fn online_panel() -> Self {
        Self {
            filter: ViewFilter {
                active: ActiveFilter::Any,
                online_only: true,
            },
            pin_online: false,
        }
    }
}
