//! Online orders panel: delivery and marketplace orders with day totals.

use rust_decimal::Decimal;

use crate::models::{Order, OrderStatus};
use crate::sync::ActiveFilter;

/// Counts per status over the online orders in view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnlineStats {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub preparing: usize,
    pub ready: usize,
    pub completed: usize,
    /// Sum of totals over orders that were not cancelled.
    pub revenue: Decimal,
}

impl OnlineStats {
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut stats = OnlineStats {
            total: orders.len(),
            ..Default::default()
        };
        for order in orders {
            match order.status {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Confirmed => stats.confirmed += 1,
                OrderStatus::Preparing => stats.preparing += 1,
                OrderStatus::Ready => stats.ready += 1,
                OrderStatus::Completed => stats.completed += 1,
                OrderStatus::Served | OrderStatus::Cancelled => {}
            }
            if order.status != OrderStatus::Cancelled {
                stats.revenue += order.total;
            }
        }
        stats
    }

    /// Pending and confirmed, shown together as "new".
    pub fn awaiting(&self) -> usize {
        self.pending + self.confirmed
    }
}

/// The orders the panel lists: the ones still in progress.
pub fn active_orders(orders: &[Order]) -> Vec<&Order> {
    orders
        .iter()
        .filter(|o| ActiveFilter::Aggregate.admits(o.status))
        .collect()
}
