//! View-side logic shared by the kitchen board, the online orders panel
//! and the order tracker. Nothing here renders; the TUI draws from these
//! types.

pub mod banner;
pub mod kitchen;
pub mod online;
pub mod timer;
pub mod tracker;

pub use banner::{Banner, BannerState};
pub use kitchen::{KitchenBoard, Lane, Ticket};
pub use online::{OnlineStats, active_orders};
pub use timer::{elapsed_label, is_urgent};
pub use tracker::{OrderTracker, StepState, TrackerView, step_label, timeline};
