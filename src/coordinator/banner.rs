//! New-order banner and sound cue.
//!
//! Each new order gets a banner that stays up for a fixed duration. When
//! it expires the order is handed back for acknowledgement, which is what
//! clears its new flag in the collection.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;

use crate::models::{OrderEvent, OrderId, OrderKind};

/// One visible banner.
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub order_id: OrderId,
    pub order_number: String,
    pub kind: OrderKind,
    pub customer_name: Option<String>,
    pub total: Option<Decimal>,
    pub shown_at: Instant,
    pub expires_at: Instant,
}

impl Banner {
    /// Remaining display time as a fraction in `0.0..=1.0`.
    pub fn remaining_ratio(&self, now: Instant) -> f64 {
        let total = self.expires_at.saturating_duration_since(self.shown_at);
        if total.is_zero() {
            return 0.0;
        }
        let left = self.expires_at.saturating_duration_since(now);
        (left.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
    }
}

/// Banners waiting to expire, newest last.
#[derive(Debug)]
pub struct BannerState {
    duration: Duration,
    active: VecDeque<Banner>,
    sound_pending: bool,
}

impl BannerState {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            active: VecDeque::new(),
            sound_pending: false,
        }
    }

    /// Shows a banner for `event` and queues the sound cue.
    ///
    /// Returns `false` (and does nothing) for events without an order id or
    /// for an order that already has a banner up.
    pub fn show(&mut self, event: &OrderEvent, now: Instant) -> bool {
        let Some(order_id) = event.order_id.clone() else {
            return false;
        };
        if self.active.iter().any(|b| b.order_id == order_id) {
            return false;
        }

        self.active.push_back(Banner {
            order_id,
            order_number: event.order_number.clone(),
            kind: event.order_kind,
            customer_name: event.customer_name.clone(),
            total: event.total,
            shown_at: now,
            expires_at: now + self.duration,
        });
        self.sound_pending = true;
        true
    }

    /// Returns `true` once per batch of new banners.
    pub fn take_sound(&mut self) -> bool {
        std::mem::take(&mut self.sound_pending)
    }

    /// Drops expired banners and returns their orders for acknowledgement.
    pub fn tick(&mut self, now: Instant) -> Vec<OrderId> {
        let mut expired = Vec::new();
        self.active.retain(|banner| {
            if banner.expires_at <= now {
                expired.push(banner.order_id.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Closes the newest banner early. Returns its order for
    /// acknowledgement.
    pub fn dismiss(&mut self) -> Option<OrderId> {
        self.active.pop_back().map(|b| b.order_id)
    }

    /// The banner to display: the most recent one.
    pub fn current(&self) -> Option<&Banner> {
        self.active.back()
    }

    pub fn pending(&self) -> usize {
        self.active.len()
    }
}
