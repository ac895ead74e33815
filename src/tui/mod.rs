//! Terminal User Interface for the order displays.
//!
//! Provides a Ratatui-based TUI for the kitchen board, the online orders
//! panel and single-order tracking.

pub mod app;
pub mod components;
pub mod event;
pub mod screens;
pub mod terminal;
pub mod ui;

pub use app::{App, Screen};
pub use event::{Action, Event, Message};
pub use terminal::{Tui, restore_terminal, setup_terminal};
pub use ui::render;
