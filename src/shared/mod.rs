//! Shared Module
//!
//! This module contains the platform-agnostic types used by the sync core:
//! tagged sync events, remote change notifications, user-facing notifications,
//! configuration and error types.
//!
//! # Overview
//!
//! Nothing in here owns a timer or a task. These types are plain data that
//! producers and consumers exchange, most of them serializable so they can be
//! logged or persisted by the surrounding application.

/// Remote change-feed types
pub mod change;

/// Tagged sync events
pub mod event;

/// User-facing notifications
pub mod notification;

/// Shared error types
pub mod error;

/// Sync configuration
pub mod config;

mod guard;
pub(crate) use guard::lock;

/// Re-export commonly used types for convenience
pub use change::{ChangeKind, ChangeNotification, ResourceFamily};
pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
pub use error::SyncError;
pub use event::{EventSource, OriginFlags, RefreshDisposition, SyncEvent, SyncEventKind};
pub use notification::{Notification, NotificationLevel, NotificationLog, Notifier, TracingNotifier};
