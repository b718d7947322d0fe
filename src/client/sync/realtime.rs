//! # Realtime Channel Manager
//!
//! Owns one change-feed channel per watched resource family and turns raw
//! notifications into a single `DataChanged` event per burst.
//!
//! ## Flow
//!
//! ```text
//! feed ──notification──> hint toast + settle timer (300ms) ──> router.publish(DataChanged)
//! ```
//!
//! Notifications arriving while the settle timer is armed are absorbed, so a
//! bulk write touching many rows yields one downstream refresh.
//!
//! Subscription failures are logged and counted, never retried here; the
//! connectivity monitor is what reports the outage. Re-activating after a
//! remount opens only the channels that are not already open.

use crate::client::feed::ChangeFeed;
use crate::client::sync::edit_state::{EditStateTracker, RefreshOutcome};
use crate::client::sync::metrics::SyncMetrics;
use crate::client::sync::router::UpdateEventRouter;
use crate::shared::change::{ChangeNotification, ResourceFamily};
use crate::shared::event::{EventSource, SyncEvent};
use crate::shared::lock;
use crate::shared::notification::{Notification, Notifier};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug)]
struct OpenChannel {
    family: ResourceFamily,
    subscription: Uuid,
    listener: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct RealtimeInner {
    channels: Vec<OpenChannel>,
    settle_timer: Option<JoinHandle<()>>,
    epoch: u64,
}

impl RealtimeInner {
    fn cancel_settle(&mut self) -> bool {
        self.epoch += 1;
        match self.settle_timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }
}

struct RealtimeShared {
    feed: Arc<dyn ChangeFeed>,
    router: UpdateEventRouter,
    tracker: EditStateTracker,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<SyncMetrics>,
    families: Vec<ResourceFamily>,
    settle_delay: Duration,
    runtime: Handle,
    inner: Mutex<RealtimeInner>,
}

/// Subscription manager for the remote change feed
#[derive(Clone)]
pub struct RealtimeChannelManager {
    shared: Arc<RealtimeShared>,
}

impl fmt::Debug for RealtimeChannelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeChannelManager")
            .field("families", &self.shared.families)
            .field("open", &self.open_families())
            .field("settle_delay", &self.shared.settle_delay)
            .finish()
    }
}

impl RealtimeChannelManager {
    pub fn new(
        feed: Arc<dyn ChangeFeed>,
        router: UpdateEventRouter,
        tracker: EditStateTracker,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<SyncMetrics>,
        families: Vec<ResourceFamily>,
        settle_delay: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(RealtimeShared {
                feed,
                router,
                tracker,
                notifier,
                metrics,
                families,
                settle_delay,
                runtime,
                inner: Mutex::new(RealtimeInner::default()),
            }),
        }
    }

    /// Open one channel per watched family that is not already open.
    /// Returns the number of channels open afterwards.
    pub fn activate(&self) -> usize {
        let mut inner = lock(&self.shared.inner);
        for family in &self.shared.families {
            if inner.channels.iter().any(|c| c.family == *family) {
                continue;
            }
            match self.shared.feed.subscribe(*family) {
                Ok(subscription) => {
                    let weak = Arc::downgrade(&self.shared);
                    let listener = self.shared.runtime.spawn(Self::listen(
                        weak,
                        *family,
                        subscription.receiver,
                    ));
                    tracing::info!(
                        "[Realtime] channel {} open ({})",
                        family.channel_name(),
                        subscription.id
                    );
                    inner.channels.push(OpenChannel {
                        family: *family,
                        subscription: subscription.id,
                        listener,
                    });
                }
                Err(e) => {
                    tracing::warn!("[Realtime] {}", e);
                    self.shared.metrics.record_subscription_failure();
                }
            }
        }
        inner.channels.len()
    }

    /// Close every open channel and drop a pending settle. Idempotent.
    pub fn deactivate(&self) {
        self.shared.close_all();
    }

    /// Families with an open channel
    pub fn open_families(&self) -> Vec<ResourceFamily> {
        lock(&self.shared.inner)
            .channels
            .iter()
            .map(|c| c.family)
            .collect()
    }

    /// Refresh now, skipping the settle delay. Still gated by the edit state.
    pub fn force_refresh(&self) -> RefreshOutcome {
        if lock(&self.shared.inner).cancel_settle() {
            tracing::debug!("[Realtime] pending settle superseded by manual refresh");
        }
        let outcome = self.shared.tracker.request_refresh();
        tracing::info!("[Realtime] manual refresh: {:?}", outcome);
        outcome
    }

    async fn listen(
        weak: Weak<RealtimeShared>,
        family: ResourceFamily,
        mut receiver: tokio::sync::mpsc::UnboundedReceiver<ChangeNotification>,
    ) {
        while let Some(notification) = receiver.recv().await {
            let Some(shared) = weak.upgrade() else {
                break;
            };
            shared.on_notification(family, notification);
        }
        tracing::debug!("[Realtime] listener for {} finished", family);
    }
}

impl RealtimeShared {
    fn on_notification(self: &Arc<Self>, family: ResourceFamily, notification: ChangeNotification) {
        self.metrics.record_notification();
        tracing::info!(
            "[Realtime] {:?} on {} ({} channel)",
            notification.event,
            notification.table,
            family
        );
        self.notifier
            .notify(Notification::info(format!("Update incoming: {}", family.table())));

        let mut inner = lock(&self.inner);
        if inner.settle_timer.is_some() {
            tracing::trace!("[Realtime] absorbed into pending settle");
            return;
        }

        let epoch = inner.epoch;
        let weak = Arc::downgrade(self);
        let delay = self.settle_delay;
        inner.settle_timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            {
                let mut inner = lock(&shared.inner);
                if inner.epoch != epoch {
                    return;
                }
                inner.settle_timer = None;
            }
            tracing::debug!("[Realtime] burst settled, publishing change");
            shared
                .router
                .publish(SyncEvent::synced_change(EventSource::Realtime(family)));
        }));
    }

    fn close_all(&self) {
        let mut inner = lock(&self.inner);
        inner.cancel_settle();
        for channel in inner.channels.drain(..) {
            channel.listener.abort();
            if self.feed.unsubscribe(channel.subscription) {
                tracing::info!("[Realtime] channel {} closed", channel.family.channel_name());
            } else {
                tracing::debug!(
                    "[Realtime] channel {} was already released",
                    channel.family.channel_name()
                );
            }
        }
    }
}

impl Drop for RealtimeShared {
    fn drop(&mut self) {
        self.close_all();
    }
}
