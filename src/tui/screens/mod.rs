//! One module per view.

pub mod kitchen;
pub mod online;
pub mod tracker;
