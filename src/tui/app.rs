//! Application state for the TUI.

use std::time::{Duration, Instant};

use crate::coordinator::{BannerState, KitchenBoard, TrackerView, active_orders};
use crate::models::{Order, OrderId};
use crate::sync::CollectionView;
use crate::websocket::ConnectionState;

/// How long a toast stays on screen.
const TOAST_TTL: Duration = Duration::from_secs(5);

/// Which view this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Kitchen,
    Online,
    Tracker,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Kitchen => "Kitchen",
            Screen::Online => "Online Orders",
            Screen::Tracker => "Order Tracking",
        }
    }
}

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

/// A transient message in the status bar.
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub timestamp: Instant,
}

/// Central application state container.
pub struct App {
    pub screen: Screen,
    /// Restaurant id, or order id for the tracker.
    pub subject: String,

    // -- Feed State --
    /// Latest collection from the subscription.
    pub collection: CollectionView,
    /// Latest tracker state.
    pub tracker: TrackerView,
    pub connection: ConnectionState,

    // -- Notifications --
    pub banners: BannerState,
    pub toast: Option<Toast>,
    /// Set when a new order should ring the terminal bell.
    pub ring_bell: bool,

    // -- UI State --
    /// Index into the selectable orders of the current screen.
    pub selected: usize,
    /// An action is waiting for the backend.
    pub busy: bool,

    /// Flag to signal application should quit.
    pub should_quit: bool,
}

impl App {
    pub fn new(screen: Screen, subject: impl Into<String>, banner_duration: Duration) -> Self {
        Self {
            screen,
            subject: subject.into(),
            collection: CollectionView::default(),
            tracker: TrackerView {
                loading: true,
                ..Default::default()
            },
            connection: ConnectionState::Connecting,
            banners: BannerState::new(banner_duration),
            toast: None,
            ring_bell: false,
            selected: 0,
            busy: false,
            should_quit: false,
        }
    }

    /// Orders the cursor moves over, in display order.
    pub fn selectable(&self) -> Vec<&Order> {
        match self.screen {
            Screen::Kitchen => {
                let board = KitchenBoard::from_view(&self.collection);
                let ids: Vec<OrderId> = crate::coordinator::Lane::ALL
                    .iter()
                    .flat_map(|lane| board.lane(*lane).iter().map(|t| t.order.id.clone()))
                    .collect();
                ids.iter().filter_map(|id| self.collection.get(id)).collect()
            }
            Screen::Online => active_orders(&self.collection.orders),
            Screen::Tracker => self.tracker.order.iter().collect(),
        }
    }

    pub fn selected_order(&self) -> Option<&Order> {
        self.selectable().get(self.selected).copied()
    }

    pub fn select_next(&mut self) {
        let len = self.selectable().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keeps the cursor in range after the collection changed.
    pub fn clamp_selection(&mut self) {
        let len = self.selectable().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            level: ToastLevel::Error,
            timestamp: Instant::now(),
        });
    }

    pub fn show_info(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            level: ToastLevel::Info,
            timestamp: Instant::now(),
        });
    }

    /// Clears toasts older than five seconds.
    pub fn clear_stale_toast(&mut self) {
        if let Some(ref toast) = self.toast
            && toast.timestamp.elapsed() > TOAST_TTL
        {
            self.toast = None;
        }
    }
}
