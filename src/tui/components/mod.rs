//! Widgets shared by every screen.

pub mod banner;
pub mod status_bar;
