//! # Refresh Dispatcher
//!
//! The router subscriber that turns sync events into edit-gate calls. Edit
//! signals are forwarded as-is; `DataChanged` events are filtered by their
//! origin flags and debounced before a refresh is requested.

use crate::client::sync::edit_state::EditStateTracker;
use crate::client::sync::metrics::SyncMetrics;
use crate::client::sync::router::{SubscriptionId, UpdateEventRouter};
use crate::shared::event::{RefreshDisposition, SyncEvent, SyncEventKind};
use crate::shared::lock;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct DispatcherInner {
    subscription: Option<SubscriptionId>,
    debounce_timer: Option<JoinHandle<()>>,
    epoch: u64,
    dirty: bool,
}

#[derive(Debug)]
struct DispatcherShared {
    router: UpdateEventRouter,
    tracker: EditStateTracker,
    debounce: Duration,
    metrics: Arc<SyncMetrics>,
    runtime: Handle,
    inner: Mutex<DispatcherInner>,
}

#[derive(Debug, Clone)]
pub struct RefreshDispatcher {
    shared: Arc<DispatcherShared>,
}

impl RefreshDispatcher {
    pub fn new(
        router: UpdateEventRouter,
        tracker: EditStateTracker,
        debounce: Duration,
        metrics: Arc<SyncMetrics>,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(DispatcherShared {
                router,
                tracker,
                debounce,
                metrics,
                runtime,
                inner: Mutex::new(DispatcherInner::default()),
            }),
        }
    }

    /// Subscribe to the router. Idempotent.
    pub fn activate(&self) {
        let mut inner = lock(&self.shared.inner);
        if inner.subscription.is_some() {
            return;
        }
        let weak: Weak<DispatcherShared> = Arc::downgrade(&self.shared);
        let id = self.shared.router.subscribe(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.handle(event);
            }
        });
        inner.subscription = Some(id);
        tracing::debug!("[SYNC] refresh dispatcher subscribed");
    }

    /// Unsubscribe and drop any armed debounce. Idempotent.
    pub fn deactivate(&self) {
        self.shared.deactivate();
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared.inner).subscription.is_some()
    }

    /// Whether a change was seen that has not yet been handed to the edit gate
    pub fn is_dirty(&self) -> bool {
        lock(&self.shared.inner).dirty
    }
}

impl DispatcherShared {
    fn handle(self: &Arc<Self>, event: &SyncEvent) {
        match event.kind {
            SyncEventKind::EditStart => self.tracker.edit_start(),
            SyncEventKind::EditEnd => self.tracker.edit_end(),
            SyncEventKind::DataChanged => match event.origin.disposition() {
                RefreshDisposition::Suppress => {
                    tracing::trace!("[SYNC] change from {:?} already accounted for", event.source);
                    self.metrics.record_suppressed();
                }
                RefreshDisposition::BookkeepingOnly => {
                    tracing::trace!("[SYNC] bookkeeping-only change from {:?}", event.source);
                    lock(&self.inner).dirty = false;
                }
                RefreshDisposition::Refresh => self.schedule_refresh(event),
            },
        }
    }

    fn schedule_refresh(self: &Arc<Self>, event: &SyncEvent) {
        let mut inner = lock(&self.inner);
        inner.dirty = true;
        if inner.debounce_timer.is_some() {
            tracing::trace!("[SYNC] change from {:?} absorbed by debounce", event.source);
            return;
        }

        let epoch = inner.epoch;
        let weak = Arc::downgrade(self);
        let debounce = self.debounce;
        inner.debounce_timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            {
                let mut inner = lock(&shared.inner);
                if inner.epoch != epoch {
                    return;
                }
                inner.debounce_timer = None;
                inner.dirty = false;
            }
            let outcome = shared.tracker.request_refresh();
            tracing::debug!("[SYNC] debounced refresh request: {:?}", outcome);
        }));
    }

    fn deactivate(&self) {
        let mut inner = lock(&self.inner);
        if let Some(id) = inner.subscription.take() {
            self.router.unsubscribe(id);
            tracing::debug!("[SYNC] refresh dispatcher unsubscribed");
        }
        if let Some(timer) = inner.debounce_timer.take() {
            timer.abort();
        }
        inner.epoch += 1;
        inner.dirty = false;
    }
}

impl Drop for DispatcherShared {
    fn drop(&mut self) {
        self.deactivate();
    }
}
