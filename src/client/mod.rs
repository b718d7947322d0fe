//! Client-side sync core
//!
//! Boundary adapters (`feed`, `probe`, `storage`) and the `sync` components
//! that sit between them and a planning view.

pub mod config;
pub mod feed;
pub mod probe;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use feed::{ChangeFeed, FeedSubscription, LocalChangeFeed};
#[cfg(feature = "http-probe")]
pub use probe::HttpProbe;
pub use probe::{probe_fn, FnProbe, ReachabilityProbe};
pub use storage::{LocalStorage, StorageEvent, StorageOrigin, StorageTab, TabId};
pub use sync::{SyncSession, SyncSessionBuilder};
