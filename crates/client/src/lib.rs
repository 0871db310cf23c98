//! View-model layer for the pantry screens.
//!
//! An [`ItemCache`] mirrors one owner's collection in memory, loads it
//! through the repository, and applies local updates after each successful
//! write so screens can render without re-fetching. State changes are
//! published on a `tokio::sync::watch` channel.

pub mod cache;
pub mod error;
pub mod notifier;
pub mod telemetry;

pub use cache::{BuyListCache, CacheState, FridgeCache, ItemCache};
pub use error::CacheError;
pub use notifier::{LogNotifier, Notifier};
