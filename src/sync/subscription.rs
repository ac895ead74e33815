//! One restaurant's live order feed.
//!
//! A [`Subscription`] wires a channel [`Supervisor`], a snapshot
//! [`Fetcher`] and an actor task that owns the [`OrderCollection`].
//! Everything that changes the collection reaches the actor as a
//! [`SyncMessage`] on one mailbox, so changes apply strictly in arrival
//! order and no lock guards the collection. Views read immutable
//! [`CollectionView`] copies through a `watch` channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use super::collection::{CollectionView, EventOutcome, OrderCollection};
use super::fetcher::{FetchResult, Fetcher, FetcherHandle};
use super::filter::ViewOptions;
use crate::backend::OrderBackend;
use crate::config::SyncSettings;
use crate::models::{Order, OrderEvent, OrderId, OrderStatus};
use crate::websocket::{ConnectionState, Dialer, Supervisor, SupervisorCommand, SupervisorHandle};
use crate::{ExpoError, Result};

/// Mailbox message for the collection actor.
#[derive(Debug)]
pub enum SyncMessage {
    /// Push event from the order channel.
    Event(OrderEvent),
    /// Snapshot pull result.
    Fetched(FetchResult),
    /// Clear a new flag.
    Acknowledge(OrderId),
    /// Authoritative order returned by a status change.
    Applied(Order),
}

impl From<OrderEvent> for SyncMessage {
    fn from(event: OrderEvent) -> Self {
        SyncMessage::Event(event)
    }
}

impl From<FetchResult> for SyncMessage {
    fn from(result: FetchResult) -> Self {
        SyncMessage::Fetched(result)
    }
}

/// Transient notifications for the view (banner, toast, sound).
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A previously unseen order arrived, pushed over the channel or found
    /// by a snapshot.
    NewOrder(OrderEvent),
    /// A snapshot pull failed; the previous snapshot is still shown.
    FetchFailed(String),
}

/// Synchronous teardown of every task a subscription owns.
///
/// Running it stops the poll timer and the actor, and asks the supervisor
/// to cancel any pending retry and close its channel with a normal-closure
/// code. Idempotent.
#[derive(Debug, Clone)]
pub(crate) struct Teardown {
    fetcher: Option<AbortHandle>,
    actor: AbortHandle,
    supervisor: mpsc::UnboundedSender<SupervisorCommand>,
    closed: Arc<AtomicBool>,
}

impl Teardown {
    /// Returns `false` if teardown had already run.
    pub(crate) fn run(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if let Some(fetcher) = &self.fetcher {
            fetcher.abort();
        }
        self.actor.abort();
        let _ = self.supervisor.send(SupervisorCommand::Shutdown);
        first
    }
}

/// Order workflow requests for one subscription.
///
/// Cheap to clone, so requests can run on their own tasks while the
/// subscription keeps serving the view. Successful results are fed back
/// to the collection as authoritative updates; any error leaves the
/// collection unchanged.
#[derive(Clone)]
pub struct OrderActions {
    backend: Arc<dyn OrderBackend>,
    mailbox: mpsc::UnboundedSender<SyncMessage>,
    view: watch::Receiver<CollectionView>,
    closed: Arc<AtomicBool>,
}

impl OrderActions {
    fn current(&self, id: &OrderId) -> Result<Order> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExpoError::SubscriptionClosed);
        }
        self.view
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| ExpoError::NotFound(id.to_string()))
    }

    /// Clears the new flag of `id`.
    pub fn acknowledge_new(&self, id: &OrderId) {
        let _ = self.mailbox.send(SyncMessage::Acknowledge(id.clone()));
    }

    /// Moves `id` to `target` and applies the result without waiting for
    /// the next poll.
    ///
    /// # Errors
    ///
    /// Fails without contacting the backend with
    /// [`ExpoError::AlreadyTerminal`] or [`ExpoError::InvalidTransition`]
    /// when the workflow forbids the move, [`ExpoError::NotFound`] when
    /// the order is not in this view and [`ExpoError::SubscriptionClosed`]
    /// after teardown. Backend failures are returned as is.
    pub async fn request_transition(&self, id: &OrderId, target: OrderStatus) -> Result<Order> {
        let current = self.current(id)?;
        if current.status.is_terminal() {
            return Err(ExpoError::AlreadyTerminal(current.status));
        }
        if !current.status.can_transition_to(target) {
            return Err(ExpoError::InvalidTransition {
                from: current.status,
                to: target,
            });
        }
        if target == OrderStatus::Cancelled {
            self.request_cancel(id).await?;
            return Ok(Order {
                status: OrderStatus::Cancelled,
                ..current
            });
        }

        let updated = self.backend.update_status(id, target).await?;
        debug!(order_id = %id, from = %current.status, to = %updated.status, "Transition applied");

        let _ = self.mailbox.send(SyncMessage::Applied(updated.clone()));
        let _ = self.mailbox.send(SyncMessage::Acknowledge(id.clone()));
        Ok(updated)
    }

    /// Advances `id` one step along the workflow.
    ///
    /// # Errors
    ///
    /// See [`OrderActions::request_transition`].
    pub async fn advance(&self, id: &OrderId) -> Result<Order> {
        let current = self.current(id)?;
        let next = current
            .status
            .next_status()
            .ok_or(ExpoError::AlreadyTerminal(current.status))?;
        self.request_transition(id, next).await
    }

    /// Cancels `id`.
    ///
    /// # Errors
    ///
    /// [`ExpoError::AlreadyTerminal`] for completed or cancelled orders,
    /// [`ExpoError::NotFound`] when the order is not in this view, or the
    /// backend's rejection.
    pub async fn request_cancel(&self, id: &OrderId) -> Result<()> {
        let current = self.current(id)?;
        if current.status.is_terminal() {
            return Err(ExpoError::AlreadyTerminal(current.status));
        }

        self.backend.cancel_order(id).await?;

        let cancelled = Order {
            status: OrderStatus::Cancelled,
            ..current
        };
        let _ = self.mailbox.send(SyncMessage::Applied(cancelled));
        let _ = self.mailbox.send(SyncMessage::Acknowledge(id.clone()));
        Ok(())
    }
}

/// A live, self-reconciling view of one restaurant's orders.
///
/// Dropping the subscription tears it down.
pub struct Subscription {
    restaurant_id: String,
    actions: OrderActions,
    notices: mpsc::UnboundedReceiver<Notice>,
    supervisor: Option<SupervisorHandle>,
    fetcher: FetcherHandle,
    teardown: Teardown,
}

impl Subscription {
    /// Opens the channel, starts polling and starts the collection actor.
    ///
    /// # Errors
    ///
    /// Returns [`ExpoError::MissingSubscriberKey`] if `restaurant_id` is
    /// blank. Nothing is started in that case.
    pub fn start<D: Dialer>(
        dialer: Arc<D>,
        backend: Arc<dyn OrderBackend>,
        restaurant_id: &str,
        options: ViewOptions,
        settings: &SyncSettings,
        fetch_limit: u32,
    ) -> Result<Self> {
        let restaurant_id = restaurant_id.trim();
        if restaurant_id.is_empty() {
            return Err(ExpoError::MissingSubscriberKey);
        }

        let (mail_tx, mail_rx) = mpsc::unbounded_channel::<SyncMessage>();
        let (view_tx, view_rx) = watch::channel(CollectionView::default());
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let supervisor = Supervisor::spawn(dialer, restaurant_id, settings.clone(), mail_tx.clone());
        let fetcher = Fetcher::spawn(
            backend.clone(),
            restaurant_id,
            settings.poll_interval,
            fetch_limit,
            mail_tx.clone(),
        );

        let actor = Actor {
            restaurant_id: restaurant_id.to_string(),
            collection: OrderCollection::new(options),
            mailbox: mail_rx,
            view: view_tx,
            notices: notice_tx,
            refresh: fetcher.notifier(),
            state: supervisor.state(),
        };
        let actor: JoinHandle<()> = tokio::spawn(actor.run());

        let closed = Arc::new(AtomicBool::new(false));
        let teardown = Teardown {
            fetcher: fetcher.abort_handle(),
            actor: actor.abort_handle(),
            supervisor: supervisor.command_sender(),
            closed: closed.clone(),
        };

        info!(restaurant_id, "Subscribed to order feed");

        Ok(Self {
            restaurant_id: restaurant_id.to_string(),
            actions: OrderActions {
                backend,
                mailbox: mail_tx,
                view: view_rx,
                closed,
            },
            notices: notice_rx,
            supervisor: Some(supervisor),
            fetcher,
            teardown,
        })
    }

    pub fn restaurant_id(&self) -> &str {
        &self.restaurant_id
    }

    /// Subscribes to collection changes.
    pub fn view(&self) -> watch::Receiver<CollectionView> {
        self.actions.view.clone()
    }

    /// The current collection.
    pub fn snapshot(&self) -> CollectionView {
        self.actions.view.borrow().clone()
    }

    /// Subscribes to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        match &self.supervisor {
            Some(supervisor) => supervisor.state(),
            None => watch::channel(ConnectionState::Closed).1,
        }
    }

    /// Resets the retry budget and reconnects now.
    pub fn reconnect(&self) {
        if let Some(supervisor) = &self.supervisor {
            supervisor.reconnect();
        }
    }

    /// Pulls a fresh snapshot now.
    pub fn refresh(&self) {
        self.fetcher.refresh_now();
    }

    /// Drains pending notices.
    pub fn notices(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }

    /// Waits for the next notice. `None` once the subscription is closed.
    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// A handle for workflow requests that can outlive this borrow.
    pub fn actions(&self) -> OrderActions {
        self.actions.clone()
    }

    /// Clears the new flag of `id`.
    pub fn acknowledge_new(&self, id: &OrderId) {
        self.actions.acknowledge_new(id);
    }

    /// See [`OrderActions::request_transition`].
    ///
    /// # Errors
    ///
    /// Workflow, lookup and backend errors; the collection is unchanged.
    pub async fn request_transition(&self, id: &OrderId, target: OrderStatus) -> Result<Order> {
        self.actions.request_transition(id, target).await
    }

    /// See [`OrderActions::advance`].
    ///
    /// # Errors
    ///
    /// Workflow, lookup and backend errors; the collection is unchanged.
    pub async fn advance(&self, id: &OrderId) -> Result<Order> {
        self.actions.advance(id).await
    }

    /// See [`OrderActions::request_cancel`].
    ///
    /// # Errors
    ///
    /// Workflow, lookup and backend errors; the collection is unchanged.
    pub async fn request_cancel(&self, id: &OrderId) -> Result<()> {
        self.actions.request_cancel(id).await
    }

    pub(crate) fn teardown(&self) -> Teardown {
        self.teardown.clone()
    }

    /// Whether this subscription, or a resubscribe for the same restaurant,
    /// has torn it down.
    pub fn is_closed(&self) -> bool {
        self.actions.closed.load(Ordering::SeqCst)
    }

    /// Tears down the poll timer, the actor and the channel. Returns
    /// immediately; the channel finishes its close handshake in the
    /// background.
    pub fn close(&mut self) {
        if self.teardown.run() {
            info!(restaurant_id = %self.restaurant_id, "Unsubscribed from order feed");
        }
    }

    /// Closes and waits for the channel to finish closing.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.join().await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owns the collection and applies mailbox messages in order.
struct Actor {
    restaurant_id: String,
    collection: OrderCollection,
    mailbox: mpsc::UnboundedReceiver<SyncMessage>,
    view: watch::Sender<CollectionView>,
    notices: mpsc::UnboundedSender<Notice>,
    refresh: Arc<Notify>,
    state: watch::Receiver<ConnectionState>,
}

impl Actor {
    async fn run(mut self) {
        let mut opened_before = false;
        let mut supervisor_alive = true;

        loop {
            tokio::select! {
                msg = self.mailbox.recv() => match msg {
                    Some(msg) => self.apply(msg),
                    None => break,
                },
                changed = self.state.changed(), if supervisor_alive => {
                    if changed.is_err() {
                        supervisor_alive = false;
                        continue;
                    }
                    if *self.state.borrow_and_update() == ConnectionState::Open {
                        // Events may have been missed while the channel was down.
                        if opened_before {
                            self.refresh.notify_one();
                        }
                        opened_before = true;
                    }
                }
            }
        }

        debug!(restaurant_id = %self.restaurant_id, "Collection actor stopped");
    }

    fn apply(&mut self, msg: SyncMessage) {
        match msg {
            SyncMessage::Event(event) => {
                let outcome = self.collection.apply_event(&event, Utc::now());
                debug!(restaurant_id = %self.restaurant_id, outcome = ?outcome, "Event applied");
                if outcome.needs_refresh() {
                    self.refresh.notify_one();
                }
                if !matches!(outcome, EventOutcome::Inserted(_)) {
                    return;
                }
                let _ = self.notices.send(Notice::NewOrder(event));
            }
            SyncMessage::Fetched(FetchResult::Snapshot(orders)) => {
                for id in self.collection.apply_snapshot(orders) {
                    if let Some(order) = self.collection.get(&id) {
                        info!(restaurant_id = %self.restaurant_id, order_id = %id, "Order found by reconciliation");
                        let _ = self.notices.send(Notice::NewOrder(OrderEvent::from(order)));
                    }
                }
            }
            SyncMessage::Fetched(FetchResult::Failed(reason)) => {
                warn!(restaurant_id = %self.restaurant_id, reason = %reason, "Keeping previous snapshot");
                let _ = self.notices.send(Notice::FetchFailed(reason));
                return;
            }
            SyncMessage::Acknowledge(id) => {
                if !self.collection.acknowledge(&id) {
                    return;
                }
            }
            SyncMessage::Applied(order) => self.collection.apply_update(order),
        }

        self.view.send_replace(self.collection.view());
    }
}
