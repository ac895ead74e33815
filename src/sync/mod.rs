//! Keeping a restaurant's order collection in sync.
//!
//! - [`filter`] - Which orders a view keeps
//! - [`collection`] - Merge of snapshots and push events
//! - [`fetcher`] - Periodic snapshot pulls
//! - [`subscription`] - Per-restaurant actor tying channel, fetcher and collection together
//! - [`feed`] - One live subscription per restaurant

pub mod collection;
pub mod feed;
pub mod fetcher;
pub mod filter;
pub mod subscription;

pub use collection::{CollectionView, EventOutcome, OrderCollection};
pub use feed::OrderFeed;
pub use fetcher::{FetchResult, Fetcher, FetcherHandle};
pub use filter::{ActiveFilter, ViewFilter, ViewOptions};
pub use subscription::{Notice, OrderActions, Subscription, SyncMessage};
