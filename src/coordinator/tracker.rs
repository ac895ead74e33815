//! Single-order tracking.
//!
//! [`OrderTracker`] polls one order until it reaches a terminal status.
//! The last good copy is kept through failures, and only a failure before
//! the first successful load is reported to the view.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::backend::OrderBackend;
use crate::models::{LIFECYCLE, Order, OrderId, OrderStatus};
use crate::sync::ActiveFilter;
use crate::{ExpoError, Result};

/// What the tracking view shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerView {
    pub order: Option<Order>,
    /// No load has completed yet, successfully or not.
    pub loading: bool,
    pub last_error: Option<String>,
    /// Polling has stopped because the order is finished.
    pub finished: bool,
}

/// Position of a lifecycle step relative to the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Done,
    Current,
    Upcoming,
}

/// Customer-facing name of a lifecycle step.
pub fn step_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Order Placed",
        OrderStatus::Confirmed => "Confirmed",
        OrderStatus::Preparing => "Preparing",
        OrderStatus::Ready => "Ready",
        OrderStatus::Served => "Served",
        OrderStatus::Completed => "Completed",
        OrderStatus::Cancelled => "Cancelled",
    }
}

/// The lifecycle steps marked against `status`. A cancelled order has no
/// current step.
pub fn timeline(status: OrderStatus) -> Vec<(OrderStatus, StepState)> {
    let current = status.lifecycle_index();
    LIFECYCLE
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let state = match current {
                Some(c) if i < c => StepState::Done,
                Some(c) if i == c => StepState::Current,
                _ => StepState::Upcoming,
            };
            (*step, state)
        })
        .collect()
}

/// Polls a single order.
pub struct OrderTracker {
    order_id: OrderId,
    view: watch::Receiver<TrackerView>,
    errors: mpsc::UnboundedReceiver<String>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl OrderTracker {
    /// Starts polling `order_id` now and then every `interval`.
    ///
    /// # Errors
    ///
    /// Returns [`ExpoError::MissingSubscriberKey`] if `order_id` is blank.
    pub fn spawn(backend: Arc<dyn OrderBackend>, order_id: &str, interval: Duration) -> Result<Self> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(ExpoError::MissingSubscriberKey);
        }
        let order_id = OrderId::from(order_id);

        let (view_tx, view_rx) = watch::channel(TrackerView {
            loading: true,
            ..Default::default()
        });
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let refresh = Arc::new(Notify::new());

        let task = tokio::spawn(poll(
            backend,
            order_id.clone(),
            interval,
            view_tx,
            error_tx,
            refresh.clone(),
        ));

        Ok(Self {
            order_id,
            view: view_rx,
            errors: error_rx,
            refresh,
            task,
        })
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn view(&self) -> watch::Receiver<TrackerView> {
        self.view.clone()
    }

    pub fn snapshot(&self) -> TrackerView {
        self.view.borrow().clone()
    }

    /// Drains error notices. Only failures before the first successful
    /// load produce one.
    pub fn errors(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(message) = self.errors.try_recv() {
            out.push(message);
        }
        out
    }

    /// Polls now, unless polling has finished.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for OrderTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll(
    backend: Arc<dyn OrderBackend>,
    order_id: OrderId,
    interval: Duration,
    view: watch::Sender<TrackerView>,
    errors: mpsc::UnboundedSender<String>,
    refresh: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = refresh.notified() => ticker.reset(),
        }

        match backend.get_order(&order_id).await {
            Ok(order) => {
                let finished = !ActiveFilter::Tracking.admits(order.status);
                debug!(order_id = %order_id, status = %order.status, "Tracked order loaded");
                view.send_modify(|v| {
                    v.order = Some(order);
                    v.loading = false;
                    v.last_error = None;
                    v.finished = finished;
                });
                if finished {
                    info!(order_id = %order_id, "Tracked order finished; polling stopped");
                    break;
                }
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Tracked order fetch failed");
                let message = match &e {
                    ExpoError::NotFound(_) => "Order not found".to_string(),
                    ExpoError::Rejected(detail) => detail.clone(),
                    other => other.to_string(),
                };
                let never_loaded = view.borrow().order.is_none();
                view.send_modify(|v| {
                    v.loading = false;
                    v.last_error = Some(message.clone());
                });
                if never_loaded {
                    let _ = errors.send(message);
                }
            }
        }
    }
}
