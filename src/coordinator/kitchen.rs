//! Kitchen display board.

use crate::models::{Order, OrderStatus};
use crate::sync::CollectionView;

/// An order card on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub order: Order,
    pub is_new: bool,
    /// Only the push event is known so far; items are still loading.
    pub is_partial: bool,
}

impl Ticket {
    /// Label of the advance action, if the kitchen can act on it.
    pub fn action(&self) -> Option<&'static str> {
        self.order.status.action_label()
    }
}

/// Board columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Pending and confirmed.
    Incoming,
    Preparing,
    Ready,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Incoming, Lane::Preparing, Lane::Ready];

    pub fn title(self) -> &'static str {
        match self {
            Lane::Incoming => "Incoming",
            Lane::Preparing => "Preparing",
            Lane::Ready => "Ready",
        }
    }

    fn of(status: OrderStatus) -> Option<Lane> {
        match status {
            OrderStatus::Pending | OrderStatus::Confirmed => Some(Lane::Incoming),
            OrderStatus::Preparing => Some(Lane::Preparing),
            OrderStatus::Ready => Some(Lane::Ready),
            _ => None,
        }
    }
}

/// The collection split into lanes, each keeping collection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KitchenBoard {
    pub incoming: Vec<Ticket>,
    pub preparing: Vec<Ticket>,
    pub ready: Vec<Ticket>,
    pub online_count: usize,
}

impl KitchenBoard {
    pub fn from_view(view: &CollectionView) -> Self {
        let mut board = KitchenBoard::default();
        for order in &view.orders {
            let Some(lane) = Lane::of(order.status) else {
                continue;
            };
            if order.kind.is_online() {
                board.online_count += 1;
            }
            let ticket = Ticket {
                is_new: view.is_new(&order.id),
                is_partial: view.is_partial(&order.id),
                order: order.clone(),
            };
            board.lane_mut(lane).push(ticket);
        }
        board
    }

    pub fn lane(&self, lane: Lane) -> &[Ticket] {
        match lane {
            Lane::Incoming => &self.incoming,
            Lane::Preparing => &self.preparing,
            Lane::Ready => &self.ready,
        }
    }

    fn lane_mut(&mut self, lane: Lane) -> &mut Vec<Ticket> {
        match lane {
            Lane::Incoming => &mut self.incoming,
            Lane::Preparing => &mut self.preparing,
            Lane::Ready => &mut self.ready,
        }
    }

    pub fn len(&self) -> usize {
        self.incoming.len() + self.preparing.len() + self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderId, OrderKind};
    use crate::sync::{OrderCollection, ViewOptions};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn order(id: &str, status: OrderStatus, kind: OrderKind, minute: u32) -> Order {
        Order {
            id: OrderId::from(id),
            order_number: id.to_uppercase(),
            status,
            kind,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap(),
            customer_name: None,
            items: Vec::new(),
            total: Decimal::ZERO,
            delivery_address: None,
            special_instructions: None,
            table_id: None,
        }
    }

    #[test]
    fn orders_land_in_their_lane() {
        let mut collection = OrderCollection::new(ViewOptions::kitchen());
        collection.apply_snapshot(vec![
            order("p", OrderStatus::Pending, OrderKind::DineIn, 1),
            order("c", OrderStatus::Confirmed, OrderKind::Delivery, 2),
            order("k", OrderStatus::Preparing, OrderKind::Takeout, 3),
            order("r", OrderStatus::Ready, OrderKind::Marketplace, 4),
        ]);

        let board = KitchenBoard::from_view(&collection.view());
        let ids = |lane| -> Vec<String> {
            board.lane(lane).iter().map(|t| t.order.id.to_string()).collect()
        };

        assert_eq!(ids(Lane::Incoming), ["c", "p"]);
        assert_eq!(ids(Lane::Preparing), ["k"]);
        assert_eq!(ids(Lane::Ready), ["r"]);
        assert_eq!(board.online_count, 2);
        assert_eq!(board.len(), 4);
    }

    #[test]
    fn tickets_carry_flags_and_actions() {
        let mut collection = OrderCollection::new(ViewOptions::kitchen());
        collection.apply_snapshot(vec![]);
        collection.apply_snapshot(vec![order("p", OrderStatus::Pending, OrderKind::DineIn, 1)]);

        let board = KitchenBoard::from_view(&collection.view());
        let ticket = &board.incoming[0];
        assert!(ticket.is_new);
        assert!(!ticket.is_partial);
        assert_eq!(ticket.action(), Some("Confirm Order"));
    }
}
