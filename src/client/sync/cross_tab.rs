//! # Cross-Tab Sync Bridge
//!
//! Re-renders a tab when another tab of the same origin writes the shared
//! planning snapshot.
//!
//! ## Event Handling
//!
//! | Source                 | Toast | Published source |
//! |------------------------|-------|------------------|
//! | write by another tab   | yes   | `CrossTab`       |
//! | [`trigger_update`]     | no    | `LocalWrite`     |
//! | write to another key   | no    | nothing          |
//!
//! Both publish a `DataChanged` tagged `from_sync`, so the event is never
//! broadcast back to the other tabs.
//!
//! [`trigger_update`]: CrossTabSyncBridge::trigger_update

use crate::client::storage::{StorageEvent, StorageOrigin, StorageTab};
use crate::client::sync::metrics::SyncMetrics;
use crate::client::sync::router::UpdateEventRouter;
use crate::shared::event::{EventSource, SyncEvent};
use crate::shared::lock;
use crate::shared::notification::{Notification, Notifier};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

struct BridgeShared {
    tab: StorageTab,
    key: String,
    router: UpdateEventRouter,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<SyncMetrics>,
    runtime: Handle,
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// Listener for storage writes made by other tabs
#[derive(Clone)]
pub struct CrossTabSyncBridge {
    shared: Arc<BridgeShared>,
}

impl fmt::Debug for CrossTabSyncBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossTabSyncBridge")
            .field("tab", &self.shared.tab.id())
            .field("key", &self.shared.key)
            .field("active", &self.is_active())
            .finish()
    }
}

impl CrossTabSyncBridge {
    pub fn new(
        tab: StorageTab,
        key: impl Into<String>,
        router: UpdateEventRouter,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<SyncMetrics>,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(BridgeShared {
                tab,
                key: key.into(),
                router,
                notifier,
                metrics,
                runtime,
                listener: Mutex::new(None),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared.listener).is_some()
    }

    /// Start listening for storage events. Idempotent.
    pub fn activate(&self) {
        let mut listener = lock(&self.shared.listener);
        if listener.is_some() {
            return;
        }
        let mut events = self.shared.tab.subscribe();
        let weak = Arc::downgrade(&self.shared);
        *listener = Some(self.shared.runtime.spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[XTAB] missed {} storage events, resyncing", skipped);
                        let Some(shared) = weak.upgrade() else {
                            break;
                        };
                        // the missed writes may have touched the snapshot
                        StorageEvent {
                            key: Some(shared.key.clone()),
                            old_value: None,
                            new_value: None,
                            origin: StorageOrigin::OtherTab(shared.tab.id()),
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.handle(&event);
            }
            tracing::debug!("[XTAB] storage listener finished");
        }));
        tracing::debug!("[XTAB] listening on '{}'", self.shared.key);
    }

    /// Stop listening. Idempotent.
    pub fn deactivate(&self) {
        self.shared.stop();
    }

    /// Announce a local write of the snapshot without a cross-tab toast
    pub fn trigger_update(&self) {
        self.shared
            .handle(&StorageEvent::synthetic(self.shared.key.clone()));
    }

    /// Process one storage event. Returns whether a change was published.
    pub fn handle(&self, event: &StorageEvent) -> bool {
        self.shared.handle(event)
    }
}

impl BridgeShared {
    fn handle(&self, event: &StorageEvent) -> bool {
        if !event.concerns(&self.key) {
            tracing::trace!("[XTAB] ignoring write to {:?}", event.key);
            return false;
        }

        match event.origin {
            StorageOrigin::OtherTab(writer) => {
                tracing::info!("[XTAB] '{}' changed in tab {}", self.key, writer);
                self.metrics.record_cross_tab_signal();
                self.notifier
                    .notify(Notification::info("Data updated in another tab"));
                self.router
                    .publish(SyncEvent::synced_change(EventSource::CrossTab));
            }
            StorageOrigin::Synthetic => {
                tracing::debug!("[XTAB] local write to '{}'", self.key);
                self.router
                    .publish(SyncEvent::synced_change(EventSource::LocalWrite));
            }
        }
        true
    }

    fn stop(&self) {
        if let Some(listener) = lock(&self.listener).take() {
            listener.abort();
            tracing::debug!("[XTAB] stopped listening on '{}'", self.key);
        }
    }
}

impl Drop for BridgeShared {
    fn drop(&mut self) {
        self.stop();
    }
}
