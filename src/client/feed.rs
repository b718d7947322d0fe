//! Remote Change Feed
//!
//! The push-based notification stream the realtime channel manager listens
//! to. The backend itself is opaque; anything that can hand out one receiver
//! per resource family and take it back again is a [`ChangeFeed`].

use crate::shared::change::{ChangeNotification, ResourceFamily};
use crate::shared::error::SyncError;
use crate::shared::lock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

/// One open logical channel on the feed
#[derive(Debug)]
pub struct FeedSubscription {
    pub id: Uuid,
    pub family: ResourceFamily,
    pub receiver: mpsc::UnboundedReceiver<ChangeNotification>,
}

/// Source of row-level change notifications
pub trait ChangeFeed: Send + Sync {
    /// Open a channel delivering every insert/update/delete on `family`
    fn subscribe(&self, family: ResourceFamily) -> Result<FeedSubscription, SyncError>;

    /// Release a channel. Returns false if the id was not live.
    fn unsubscribe(&self, id: Uuid) -> bool;
}

#[derive(Default)]
struct LocalFeedInner {
    subscribers: HashMap<Uuid, (ResourceFamily, mpsc::UnboundedSender<ChangeNotification>)>,
    fail_next: Option<String>,
}

/// In-process change feed used by the demo binary and tests
#[derive(Clone, Default)]
pub struct LocalChangeFeed {
    inner: Arc<Mutex<LocalFeedInner>>,
}

impl fmt::Debug for LocalChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalChangeFeed")
            .field("active_subscriptions", &self.active_subscriptions())
            .finish()
    }
}

impl LocalChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a notification to every live channel of its family.
    /// Returns the number of channels that received it.
    pub fn emit(&self, notification: ChangeNotification) -> usize {
        let Some(family) = notification.family() else {
            tracing::debug!("[FEED] no family for table '{}'", notification.table);
            return 0;
        };
        let mut inner = lock(&self.inner);
        let mut delivered = 0;
        inner.subscribers.retain(|_, (sub_family, sender)| {
            if *sub_family != family {
                return true;
            }
            match sender.send(notification.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }

    /// Number of channels currently open
    pub fn active_subscriptions(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    /// Make the next `subscribe` call fail with `message`
    pub fn fail_next_subscribe(&self, message: impl Into<String>) {
        lock(&self.inner).fail_next = Some(message.into());
    }
}

impl ChangeFeed for LocalChangeFeed {
    fn subscribe(&self, family: ResourceFamily) -> Result<FeedSubscription, SyncError> {
        let mut inner = lock(&self.inner);
        if let Some(message) = inner.fail_next.take() {
            return Err(SyncError::subscription(family, message));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        inner.subscribers.insert(id, (family, sender));
        Ok(FeedSubscription {
            id,
            family,
            receiver,
        })
    }

    fn unsubscribe(&self, id: Uuid) -> bool {
        lock(&self.inner).subscribers.remove(&id).is_some()
    }
}
