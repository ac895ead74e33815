//! Subscription registry enforcing one live channel per restaurant.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use super::filter::ViewOptions;
use super::subscription::{Subscription, Teardown};
use crate::backend::OrderBackend;
use crate::config::SyncSettings;
use crate::websocket::{ConnectionState, Dialer};
use crate::{ExpoError, Result};

/// How long a resubscribe waits for the previous channel to close.
const CLOSE_WAIT: Duration = Duration::from_secs(5);

/// Hands out subscriptions, closing any prior one for the same restaurant
/// first.
pub struct OrderFeed<D: Dialer> {
    dialer: Arc<D>,
    backend: Arc<dyn OrderBackend>,
    settings: SyncSettings,
    fetch_limit: u32,
    live: HashMap<String, (Teardown, watch::Receiver<ConnectionState>)>,
}

impl<D: Dialer> OrderFeed<D> {
    pub fn new(
        dialer: Arc<D>,
        backend: Arc<dyn OrderBackend>,
        settings: SyncSettings,
        fetch_limit: u32,
    ) -> Self {
        Self {
            dialer,
            backend,
            settings,
            fetch_limit,
            live: HashMap::new(),
        }
    }

    pub fn backend(&self) -> Arc<dyn OrderBackend> {
        self.backend.clone()
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Subscribes to `restaurant_id`.
    ///
    /// A prior subscription for the same restaurant is torn down, and its
    /// channel given a few seconds to finish closing, before the new one
    /// dials. The old [`Subscription`] value stays valid but inert.
    ///
    /// # Errors
    ///
    /// Returns [`ExpoError::MissingSubscriberKey`] if `restaurant_id` is
    /// blank.
    pub async fn subscribe(&mut self, restaurant_id: &str, options: ViewOptions) -> Result<Subscription> {
        let key = restaurant_id.trim();
        if key.is_empty() {
            return Err(ExpoError::MissingSubscriberKey);
        }

        if let Some((teardown, mut state)) = self.live.remove(key) {
            info!(restaurant_id = key, "Closing previous subscription");
            teardown.run();
            let timed_out = tokio::time::timeout(
                CLOSE_WAIT,
                state.wait_for(|s| *s == ConnectionState::Closed),
            )
            .await
            .is_err();
            if timed_out {
                warn!(restaurant_id = key, "Previous channel still closing");
            }
        }

        let subscription = Subscription::start(
            self.dialer.clone(),
            self.backend.clone(),
            key,
            options,
            &self.settings,
            self.fetch_limit,
        )?;
        self.live.insert(
            key.to_string(),
            (subscription.teardown(), subscription.connection_state()),
        );

        Ok(subscription)
    }

    /// Tears down the subscription for `restaurant_id`, if any.
    pub fn unsubscribe(&mut self, restaurant_id: &str) -> bool {
        match self.live.remove(restaurant_id.trim()) {
            Some((teardown, _)) => {
                teardown.run();
                true
            }
            None => false,
        }
    }

    /// Number of subscriptions whose supervisor is still running.
    pub fn live_count(&mut self) -> usize {
        self.live.retain(|_, (_, state)| state.has_changed().is_ok());
        self.live.len()
    }
}

impl<D: Dialer> Drop for OrderFeed<D> {
    fn drop(&mut self) {
        for (teardown, _) in self.live.values() {
            teardown.run();
        }
    }
}
