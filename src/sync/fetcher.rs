//! Periodic snapshot pulls, independent of the push channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::backend::OrderBackend;
use crate::models::Order;

/// Outcome of one pull.
#[derive(Debug)]
pub enum FetchResult {
    Snapshot(Vec<Order>),
    Failed(String),
}

/// Pulls restaurant snapshots on an interval.
pub struct Fetcher;

impl Fetcher {
    /// Starts polling `restaurant_id`: once immediately, then every
    /// `interval`.
    ///
    /// A pull is awaited before the next one can start, and ticks missed
    /// meanwhile are delayed rather than bursted, so at most one request
    /// is ever in flight. Failures are reported and polling continues.
    pub fn spawn<T>(
        backend: Arc<dyn OrderBackend>,
        restaurant_id: impl Into<String>,
        interval: Duration,
        limit: u32,
        out: mpsc::UnboundedSender<T>,
    ) -> FetcherHandle
    where
        T: From<FetchResult> + Send + 'static,
    {
        let restaurant_id = restaurant_id.into();
        let refresh = Arc::new(Notify::new());
        let wake = refresh.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = wake.notified() => {
                        debug!(restaurant_id = %restaurant_id, "Out-of-band refresh");
                        ticker.reset();
                    }
                }

                let result = match backend.list_orders(&restaurant_id, limit).await {
                    Ok(orders) => FetchResult::Snapshot(orders),
                    Err(e) => {
                        warn!(restaurant_id = %restaurant_id, error = %e, "Snapshot fetch failed");
                        FetchResult::Failed(e.to_string())
                    }
                };

                if out.send(T::from(result)).is_err() {
                    break;
                }
            }
        });

        FetcherHandle {
            refresh,
            task: Some(task),
        }
    }
}

/// Controls a running fetcher. Dropping it stops polling.
pub struct FetcherHandle {
    refresh: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl FetcherHandle {
    /// Requests a pull now. Requests made while a pull is in flight
    /// coalesce into one follow-up pull.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Stops polling. An in-flight pull is dropped.
    pub fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub(crate) fn abort_handle(&self) -> Option<tokio::task::AbortHandle> {
        self.task.as_ref().map(JoinHandle::abort_handle)
    }

    pub(crate) fn notifier(&self) -> Arc<Notify> {
        self.refresh.clone()
    }
}

impl Drop for FetcherHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
