//! Event handling for the TUI.

use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::coordinator::TrackerView;
use crate::models::{Order, OrderId};
use crate::sync::{CollectionView, Notice};
use crate::websocket::ConnectionState;

use super::app::{App, Screen};

/// Events that can occur in the application.
#[derive(Debug)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// Terminal was resized.
    Resize(u16, u16),
    /// Periodic tick for UI updates.
    Tick,
}

/// Messages that update application state.
#[derive(Debug)]
pub enum Message {
    /// Input event from terminal.
    Input(Event),

    /// The subscription's collection changed.
    Collection(CollectionView),
    /// Connection state changed.
    Connection(ConnectionState),
    /// Banner or toast from the subscription.
    Notice(Notice),

    /// The tracked order changed.
    Tracker(TrackerView),
    /// The tracked order could not be loaded.
    TrackerError(String),

    /// A status change or cancellation succeeded.
    ActionSucceeded(String),
    /// A status change or cancellation failed.
    ActionFailed(String),

    /// Request to quit the application.
    Quit,
}

/// Actions that require the subscription or tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Advance an order one workflow step.
    Advance(OrderId),
    /// Cancel an order.
    Cancel(OrderId),
    /// Clear an order's new flag.
    Acknowledge(OrderId),
    /// Manual reconnect.
    Reconnect,
    /// Pull a fresh snapshot now.
    Refresh,
}

/// Spawns a task that polls for terminal events and sends them to a channel.
pub fn spawn_event_reader(tx: mpsc::UnboundedSender<Message>) {
    tokio::spawn(async move {
        loop {
            // Poll for events with a 50ms timeout
            match tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await
            {
                Ok(Some(CrosstermEvent::Key(key))) => {
                    if tx.send(Message::Input(Event::Key(key))).is_err() {
                        break;
                    }
                }
                Ok(Some(CrosstermEvent::Resize(w, h))) => {
                    if tx.send(Message::Input(Event::Resize(w, h))).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });
}

/// Spawns a task that sends periodic tick events.
pub fn spawn_tick_timer(tx: mpsc::UnboundedSender<Message>, interval_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        loop {
            interval.tick().await;
            if tx.send(Message::Input(Event::Tick)).is_err() {
                break;
            }
        }
    });
}

/// Updates application state based on a message.
pub fn update(app: &mut App, message: Message) -> Vec<Action> {
    match message {
        Message::Input(event) => handle_input(app, event),
        Message::Collection(view) => {
            app.collection = view;
            app.clamp_selection();
            Vec::new()
        }
        Message::Connection(state) => {
            if state == ConnectionState::Failed {
                app.show_error("Offline: press r to reconnect");
            } else if app.connection == ConnectionState::Failed && state == ConnectionState::Open {
                app.show_info("Reconnected");
            }
            app.connection = state;
            Vec::new()
        }
        Message::Notice(Notice::NewOrder(event)) => {
            if app.banners.show(&event, Instant::now()) && app.banners.take_sound() {
                app.ring_bell = true;
            }
            Vec::new()
        }
        Message::Notice(Notice::FetchFailed(reason)) => {
            app.show_error(format!("Failed to load orders: {reason}"));
            Vec::new()
        }
        Message::Tracker(view) => {
            app.tracker = view;
            app.clamp_selection();
            Vec::new()
        }
        Message::TrackerError(message) => {
            app.show_error(message);
            Vec::new()
        }
        Message::ActionSucceeded(message) => {
            app.busy = false;
            app.show_info(message);
            Vec::new()
        }
        Message::ActionFailed(message) => {
            app.busy = false;
            app.show_error(message);
            Vec::new()
        }
        Message::Quit => {
            app.should_quit = true;
            Vec::new()
        }
    }
}

/// Handles input events and updates application state.
fn handle_input(app: &mut App, event: Event) -> Vec<Action> {
    match event {
        Event::Key(key) => handle_key(app, key).into_iter().collect(),
        Event::Resize(_, _) => Vec::new(),
        Event::Tick => {
            app.clear_stale_toast();
            app.banners
                .tick(Instant::now())
                .into_iter()
                .map(Action::Acknowledge)
                .collect()
        }
    }
}

/// Handles key press events.
fn handle_key(app: &mut App, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc if key.modifiers.is_empty() => {
            app.should_quit = true;
            None
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            None
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next();
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_previous();
            None
        }
        KeyCode::Char('r') => Some(Action::Reconnect),
        KeyCode::Char('f') => Some(Action::Refresh),
        KeyCode::Char('d') => app.banners.dismiss().map(Action::Acknowledge),
        KeyCode::Enter if app.screen == Screen::Kitchen => order_action(app, Action::Advance),
        KeyCode::Char('x') if app.screen == Screen::Kitchen => order_action(app, Action::Cancel),
        _ => None,
    }
}

/// Builds an action on the selected order, unless one is already running.
fn order_action(app: &mut App, action: fn(OrderId) -> Action) -> Option<Action> {
    if app.busy {
        return None;
    }
    let id = app.selected_order().map(|o: &Order| o.id.clone())?;
    app.busy = true;
    Some(action(id))
}
