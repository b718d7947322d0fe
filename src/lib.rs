//! Planning Sync - Main Library
//!
//! Client-side synchronization core for a collaborative staff-scheduling
//! planner. It keeps an open planning view current with remote changes while
//! never replacing data the user is in the middle of editing.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared by every component
//!   - Change notifications and resource families
//!   - Sync events and origin flags
//!   - Notifications, configuration and error types
//!
//! - **`client`** - The sync core itself
//!   - Boundary adapters: change feed, reachability probe, shared storage
//!   - Edit state tracker, event router and refresh dispatcher
//!   - Realtime channels, connectivity monitor, cross-tab bridge
//!   - `SyncSession`, which wires all of the above for one view
//!
//! # Feature Flags
//!
//! - **`http-probe`** (default) - `HttpProbe`, a reqwest-backed health check
//!
//! # Usage
//!
//! ```rust,no_run
//! use planning_sync::client::{probe_fn, LocalChangeFeed, LocalStorage, SyncSession};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), planning_sync::shared::SyncError> {
//! let storage = LocalStorage::new();
//! let session = SyncSession::builder()
//!     .feed(Arc::new(LocalChangeFeed::new()))
//!     .probe(Arc::new(probe_fn(|| async { true })))
//!     .storage(storage.open_tab())
//!     .on_refresh(|| tracing::info!("reloading planning data"))
//!     .build()?;
//! session.start();
//! # Ok(())
//! # }
//! ```
//!
//! # Threading
//!
//! Components are `Send + Sync` and use short std mutex critical sections;
//! timers are tokio tasks, so `start()` must be called inside a runtime.
//! Callbacks are never invoked while a component lock is held.

/// Shared types and data structures
pub mod shared;

/// Client-side sync components
pub mod client;
