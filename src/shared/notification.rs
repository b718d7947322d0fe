//! User-facing notifications
//!
//! Transient toast-style messages emitted on sync state transitions. The core
//! only decides the content; delivery belongs to whatever implements
//! [`Notifier`].

use chrono::{DateTime, Utc};
use crate::shared::lock;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A transient user-facing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    /// Create a notification stamped with the current time
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }
}

/// Delivery mechanism for notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that writes every notification to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => tracing::warn!("[TOAST] {}", notification.message),
            _ => tracing::info!("[TOAST] {}", notification.message),
        }
    }
}

/// Notifier that records notifications until a UI shell drains them
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every recorded notification, oldest first
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *lock(&self.entries))
    }

    /// Copy of the recorded notifications without draining them
    pub fn entries(&self) -> Vec<Notification> {
        lock(&self.entries).clone()
    }

    /// Number of recorded notifications at `level`
    pub fn count(&self, level: NotificationLevel) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|n| n.level == level)
            .count()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        tracing::debug!("[TOAST] recorded {:?}: {}", notification.level, notification.message);
        lock(&self.entries).push(notification);
    }
}
