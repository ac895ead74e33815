//! Merging snapshots and push events into one ordered collection.
//!
//! [`OrderCollection`] is owned by a single subscription actor and mutated
//! only through the methods here. Every mutation re-sorts the whole
//! collection; it is never patched in place.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::filter::ViewOptions;
use crate::models::{EventKind, Order, OrderEvent, OrderId};

/// Result of applying a push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not an `order.created` event.
    Ignored,
    /// The event had no order id; only a refresh can tell what it was.
    NoOrderId,
    /// The order is already present, or was seen before.
    AlreadyKnown,
    /// The view's filter excludes the order.
    Filtered,
    /// A partial entry was inserted and flagged new.
    Inserted(OrderId),
}

impl EventOutcome {
    /// Whether the caller should reconcile with a fresh snapshot.
    pub fn needs_refresh(&self) -> bool {
        matches!(self, EventOutcome::NoOrderId | EventOutcome::Inserted(_))
    }
}

/// Immutable copy of a collection handed to presentation code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionView {
    /// Orders in display order.
    pub orders: Vec<Order>,
    /// Present orders flagged new and not yet acknowledged.
    pub new_ids: HashSet<OrderId>,
    /// Orders known only from a push event so far.
    pub partial_ids: HashSet<OrderId>,
    /// Whether at least one snapshot has been applied.
    pub loaded: bool,
}

impl CollectionView {
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == id)
    }

    pub fn is_new(&self, id: &OrderId) -> bool {
        self.new_ids.contains(id)
    }

    pub fn is_partial(&self, id: &OrderId) -> bool {
        self.partial_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Orders for one subscriber, with "new" flagging.
#[derive(Debug)]
pub struct OrderCollection {
    options: ViewOptions,
    orders: HashMap<OrderId, Order>,
    /// Display order, rebuilt after every mutation.
    sorted: Vec<OrderId>,
    /// Flagged ids. May include ids that are currently absent; the flag
    /// survives until acknowledged.
    new_ids: HashSet<OrderId>,
    partial: HashSet<OrderId>,
    /// Every id this collection has ever held or flagged.
    seen: HashSet<OrderId>,
    loaded: bool,
}

impl OrderCollection {
    #[must_use]
    pub fn new(options: ViewOptions) -> Self {
        Self {
            options,
            orders: HashMap::new(),
            sorted: Vec::new(),
            new_ids: HashSet::new(),
            partial: HashSet::new(),
            seen: HashSet::new(),
            loaded: false,
        }
    }

    /// Replaces the content wholesale with an authoritative snapshot.
    ///
    /// Orders the filter rejects are dropped and repeated ids keep their
    /// first occurrence. Ids never seen before are flagged new, except on
    /// the first snapshot, which is the initial load. Creation times of
    /// orders already held in full are kept.
    ///
    /// Returns the ids this snapshot flagged, in snapshot order.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Order>) -> Vec<OrderId> {
        let initial = !self.loaded;
        let mut orders = HashMap::with_capacity(snapshot.len());
        let mut flagged = Vec::new();

        for mut order in snapshot {
            if !self.options.filter.admits(&order) || orders.contains_key(&order.id) {
                continue;
            }
            self.keep_created_at(&mut order);
            if self.seen.insert(order.id.clone()) && !initial {
                self.new_ids.insert(order.id.clone());
                flagged.push(order.id.clone());
            }
            orders.insert(order.id.clone(), order);
        }

        self.orders = orders;
        self.partial.clear();
        self.loaded = true;
        self.resort();
        flagged
    }

    /// Folds in a push event.
    ///
    /// An `order.created` for an unknown id inserts a partial entry flagged
    /// new. Known ids, including ones acknowledged or already gone, are left
    /// untouched so redelivered events are harmless.
    pub fn apply_event(&mut self, event: &OrderEvent, received_at: DateTime<Utc>) -> EventOutcome {
        if event.kind != EventKind::OrderCreated {
            return EventOutcome::Ignored;
        }
        let Some(order) = event.to_partial_order(received_at) else {
            return EventOutcome::NoOrderId;
        };
        if self.seen.contains(&order.id) || self.orders.contains_key(&order.id) {
            return EventOutcome::AlreadyKnown;
        }
        if !self.options.filter.admits(&order) {
            return EventOutcome::Filtered;
        }

        let id = order.id.clone();
        self.seen.insert(id.clone());
        self.new_ids.insert(id.clone());
        self.partial.insert(id.clone());
        self.orders.insert(id.clone(), order);
        self.resort();

        EventOutcome::Inserted(id)
    }

    /// Applies one authoritative order, as returned by a status change.
    ///
    /// The order is removed if it no longer passes the view filter. Flags
    /// are not touched.
    pub fn apply_update(&mut self, mut order: Order) {
        self.keep_created_at(&mut order);
        self.partial.remove(&order.id);
        self.seen.insert(order.id.clone());

        if self.options.filter.admits(&order) {
            self.orders.insert(order.id.clone(), order);
        } else {
            self.orders.remove(&order.id);
        }
        self.resort();
    }

    /// A full record fixes the creation time; a partial entry only holds
    /// the event's provisional one.
    fn keep_created_at(&self, order: &mut Order) {
        if self.partial.contains(&order.id) {
            return;
        }
        if let Some(known) = self.orders.get(&order.id) {
            order.created_at = known.created_at;
        }
    }

    /// Clears the new flag for `id`. Returns whether it was set.
    pub fn acknowledge(&mut self, id: &OrderId) -> bool {
        self.new_ids.remove(id)
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn is_new(&self, id: &OrderId) -> bool {
        self.new_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.sorted.iter().filter_map(|id| self.orders.get(id))
    }

    pub fn view(&self) -> CollectionView {
        CollectionView {
            orders: self.iter().cloned().collect(),
            new_ids: self
                .new_ids
                .iter()
                .filter(|id| self.orders.contains_key(*id))
                .cloned()
                .collect(),
            partial_ids: self.partial.clone(),
            loaded: self.loaded,
        }
    }

    /// Online first (when pinned), then newest first, then by id.
    fn resort(&mut self) {
        let pin_online = self.options.pin_online;
        let mut sorted: Vec<&Order> = self.orders.values().collect();
        sorted.sort_by_key(|o| {
            (
                !(pin_online && o.kind.is_online()),
                Reverse(o.created_at),
                o.id.clone(),
            )
        });
        self.sorted = sorted.into_iter().map(|o| o.id.clone()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderKind, OrderStatus};
    use crate::sync::filter::{ActiveFilter, ViewFilter};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 18, minute, 0).unwrap()
    }

    fn order(id: &str, status: OrderStatus, kind: OrderKind, minute: u32) -> Order {
        Order {
            id: OrderId::from(id),
            order_number: format!("ORD-{id}"),
            status,
            kind,
            created_at: at(minute),
            customer_name: None,
            items: Vec::new(),
            total: dec!(10.00),
            delivery_address: None,
            special_instructions: None,
            table_id: None,
        }
    }

    fn pending(id: &str, minute: u32) -> Order {
        order(id, OrderStatus::Pending, OrderKind::DineIn, minute)
    }

    fn created(id: &str, kind: &str, minute: u32) -> OrderEvent {
        serde_json::from_value(serde_json::json!({
            "event": "order.created",
            "order_id": id,
            "order_number": format!("ORD-{id}"),
            "order_type": kind,
            "total": 18.5,
            "created_at": at(minute).to_rfc3339(),
        }))
        .unwrap()
    }

    fn ids(collection: &OrderCollection) -> Vec<&str> {
        collection.iter().map(|o| o.id.as_str()).collect()
    }

    fn kitchen() -> OrderCollection {
        OrderCollection::new(ViewOptions::kitchen())
    }

    #[test]
    fn initial_snapshot_flags_nothing() {
        let mut c = kitchen();
        c.apply_snapshot(vec![pending("a", 1), pending("b", 2)]);
        assert_eq!(c.len(), 2);
        assert!(c.view().new_ids.is_empty());
        assert!(c.view().loaded);
    }

    #[test]
    fn snapshot_replaces_and_flags_only_unseen() {
        let mut c = kitchen();
        c.apply_snapshot(vec![order("A", OrderStatus::Preparing, OrderKind::DineIn, 1)]);

        let flagged = c.apply_snapshot(vec![
            order("A", OrderStatus::Ready, OrderKind::DineIn, 1),
            pending("B", 2),
        ]);

        assert_eq!(flagged, vec![OrderId::from("B")]);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&"A".into()).unwrap().status, OrderStatus::Ready);
        assert_eq!(c.get(&"B".into()).unwrap().status, OrderStatus::Pending);
        assert!(c.is_new(&"B".into()));
        assert!(!c.is_new(&"A".into()));
    }

    #[test]
    fn event_inserts_partial_immediately() {
        let mut c = kitchen();
        c.apply_snapshot(vec![pending("a", 1)]);

        let outcome = c.apply_event(&created("C", "TAKEOUT", 5), at(5));

        assert_eq!(outcome, EventOutcome::Inserted("C".into()));
        assert!(outcome.needs_refresh());
        let view = c.view();
        assert!(view.is_new(&"C".into()));
        assert!(view.is_partial(&"C".into()));
        let partial = view.get(&"C".into()).unwrap();
        assert_eq!(partial.status, OrderStatus::Pending);
        assert_eq!(partial.total, dec!(18.5));
    }

    #[test]
    fn duplicate_event_is_idempotent() {
        let mut c = kitchen();
        c.apply_snapshot(vec![pending("a", 1)]);
        let event = created("C", "TAKEOUT", 5);

        c.apply_event(&event, at(5));
        let once = c.view();
        assert_eq!(c.apply_event(&event, at(6)), EventOutcome::AlreadyKnown);

        assert_eq!(c.view(), once);
    }

    #[test]
    fn acknowledged_order_is_never_reflagged() {
        let mut c = kitchen();
        c.apply_snapshot(vec![]);
        let event = created("C", "DELIVERY", 5);
        c.apply_event(&event, at(5));
        assert!(c.acknowledge(&"C".into()));

        c.apply_event(&event, at(6));
        let flagged = c.apply_snapshot(vec![pending("C", 5)]);

        assert!(flagged.is_empty());
        assert!(!c.is_new(&"C".into()));
        assert!(!c.acknowledge(&"C".into()));
    }

    #[test]
    fn snapshot_replaces_partial_data() {
        let mut c = kitchen();
        c.apply_snapshot(vec![]);
        c.apply_event(&created("C", "TAKEOUT", 5), at(5));

        let mut full = order("C", OrderStatus::Confirmed, OrderKind::Takeout, 5);
        full.customer_name = Some("Ana".into());
        c.apply_snapshot(vec![full.clone()]);

        let view = c.view();
        assert_eq!(view.get(&"C".into()), Some(&full));
        assert!(view.partial_ids.is_empty());
        assert!(view.is_new(&"C".into()), "flag survives reconciliation");
    }

    #[test]
    fn creation_time_is_fixed_by_first_full_record() {
        let mut c = kitchen();
        c.apply_snapshot(vec![]);
        c.apply_event(&created("C", "TAKEOUT", 5), at(9));
        assert_eq!(c.get(&"C".into()).unwrap().created_at, at(5));

        // The partial time is provisional.
        c.apply_snapshot(vec![order("C", OrderStatus::Pending, OrderKind::Takeout, 6)]);
        assert_eq!(c.get(&"C".into()).unwrap().created_at, at(6));

        c.apply_snapshot(vec![order("C", OrderStatus::Confirmed, OrderKind::Takeout, 7)]);
        assert_eq!(c.get(&"C".into()).unwrap().created_at, at(6));

        c.apply_update(order("C", OrderStatus::Preparing, OrderKind::Takeout, 8));
        let kept = c.get(&"C".into()).unwrap();
        assert_eq!(kept.status, OrderStatus::Preparing);
        assert_eq!(kept.created_at, at(6));
    }

    #[test]
    fn snapshot_kind_wins_over_event_kind() {
        let mut c = kitchen();
        c.apply_snapshot(vec![]);
        c.apply_event(&created("C", "DELIVERY", 5), at(5));
        c.apply_snapshot(vec![order("C", OrderStatus::Pending, OrderKind::Takeout, 5)]);
        assert_eq!(c.get(&"C".into()).unwrap().kind, OrderKind::Takeout);
    }

    #[test]
    fn event_for_known_id_does_not_mutate() {
        let mut c = kitchen();
        c.apply_snapshot(vec![order("A", OrderStatus::Preparing, OrderKind::DineIn, 1)]);
        let before = c.view();

        assert_eq!(c.apply_event(&created("A", "DELIVERY", 9), at(9)), EventOutcome::AlreadyKnown);
        assert_eq!(c.view(), before);
    }

    #[test]
    fn non_created_events_and_missing_ids() {
        let mut c = kitchen();
        let mut event = created("C", "TABLE", 1);
        event.kind = EventKind::Other("order.updated".into());
        assert_eq!(c.apply_event(&event, at(1)), EventOutcome::Ignored);

        let mut event = created("C", "TABLE", 1);
        event.order_id = None;
        let outcome = c.apply_event(&event, at(1));
        assert_eq!(outcome, EventOutcome::NoOrderId);
        assert!(outcome.needs_refresh());
        assert!(c.is_empty());
    }

    #[test]
    fn online_orders_sort_first_then_newest() {
        let mut c = kitchen();
        c.apply_snapshot(vec![
            pending("dine-old", 1),
            pending("dine-new", 30),
            order("uber-old", OrderStatus::Pending, OrderKind::Marketplace, 2),
            order("delivery-new", OrderStatus::Confirmed, OrderKind::Delivery, 20),
            order("takeout", OrderStatus::Ready, OrderKind::Takeout, 10),
        ]);
        c.apply_event(&created("event-newest", "TABLE", 59), at(59));

        assert_eq!(
            ids(&c),
            ["delivery-new", "uber-old", "event-newest", "dine-new", "takeout", "dine-old"]
        );
    }

    #[test]
    fn equal_timestamps_break_ties_by_id() {
        let mut c = kitchen();
        c.apply_snapshot(vec![pending("b", 1), pending("a", 1), pending("c", 1)]);
        assert_eq!(ids(&c), ["a", "b", "c"]);
    }

    #[test]
    fn snapshot_duplicates_and_inactive_orders_are_dropped() {
        let mut c = kitchen();
        c.apply_snapshot(vec![
            pending("a", 1),
            order("a", OrderStatus::Ready, OrderKind::DineIn, 1),
            order("served", OrderStatus::Served, OrderKind::DineIn, 2),
            order("done", OrderStatus::Completed, OrderKind::DineIn, 3),
        ]);
        assert_eq!(ids(&c), ["a"]);
        assert_eq!(c.get(&"a".into()).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn update_applies_and_removes_on_filter_exit() {
        let mut c = kitchen();
        c.apply_snapshot(vec![pending("A", 1), pending("B", 2)]);

        c.apply_update(order("A", OrderStatus::Preparing, OrderKind::DineIn, 1));
        assert_eq!(c.get(&"A".into()).unwrap().status, OrderStatus::Preparing);

        c.apply_update(order("B", OrderStatus::Served, OrderKind::DineIn, 2));
        assert!(c.get(&"B".into()).is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn online_panel_filters_kind_but_keeps_finished() {
        let mut c = OrderCollection::new(ViewOptions::online_panel());
        c.apply_snapshot(vec![
            pending("dine", 1),
            order("d1", OrderStatus::Completed, OrderKind::Delivery, 2),
            order("m1", OrderStatus::Pending, OrderKind::Marketplace, 3),
        ]);
        assert_eq!(ids(&c), ["m1", "d1"]);
        assert_eq!(c.apply_event(&created("t", "TAKEOUT", 4), at(4)), EventOutcome::Filtered);
    }

    #[test]
    fn flags_of_absent_orders_are_hidden_but_kept() {
        let mut c = kitchen();
        c.apply_snapshot(vec![]);
        c.apply_event(&created("C", "TABLE", 5), at(5));
        // A snapshot taken before C was stored.
        c.apply_snapshot(vec![]);
        assert!(c.view().new_ids.is_empty());

        c.apply_snapshot(vec![pending("C", 5)]);
        assert!(c.view().is_new(&"C".into()));
    }

    #[test]
    fn no_duplicates_under_arbitrary_interleaving() {
        let mut c = OrderCollection::new(ViewOptions {
            filter: ViewFilter {
                active: ActiveFilter::Any,
                online_only: false,
            },
            pin_online: true,
        });
        let base = at(0);
        for round in 0..20u32 {
            let id = format!("o-{}", round % 7);
            if round % 3 == 0 {
                let snapshot = (0..round % 5)
                    .map(|n| pending(&format!("o-{n}"), n))
                    .collect();
                c.apply_snapshot(snapshot);
            } else {
                let received = base + Duration::minutes(round.into());
                c.apply_event(&created(&id, "DELIVERY", round % 60), received);
            }
            let mut seen = HashSet::new();
            assert!(c.iter().all(|o| seen.insert(o.id.clone())));
            assert_eq!(c.view().orders.len(), c.len());
        }
    }
}
