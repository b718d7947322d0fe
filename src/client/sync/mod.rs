//! # Sync Session
//!
//! Keeps a planning view in step with the backend without ever yanking data
//! out from under a user who is mid-edit.
//!
//! ## Architecture
//!
//! A [`SyncSession`] owns one of each component for the lifetime of a view:
//! - **Edit State**: gates every refresh behind the user's edit activity
//! - **Router**: synchronous in-process bus for edit and change events
//! - **Dispatcher**: the router subscriber that feeds the edit gate
//! - **Realtime**: one change-feed channel per watched resource family
//! - **Network Monitor**: polls backend reachability
//! - **Cross-Tab**: reacts to snapshot writes made by other tabs
//! - **Metrics**: counters shared by all of the above
//!
//! ## Usage
//!
//! ```rust,no_run
//! use planning_sync::client::feed::LocalChangeFeed;
//! use planning_sync::client::probe::probe_fn;
//! use planning_sync::client::storage::LocalStorage;
//! use planning_sync::client::sync::SyncSession;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), planning_sync::shared::SyncError> {
//! let storage = LocalStorage::new();
//! let session = SyncSession::builder()
//!     .feed(Arc::new(LocalChangeFeed::new()))
//!     .probe(Arc::new(probe_fn(|| async { true })))
//!     .storage(storage.open_tab())
//!     .on_refresh(|| println!("reload planning data"))
//!     .build()?;
//!
//! session.start();
//! session.edit_start();
//! // ... user types into a cell ...
//! session.edit_end();
//! # Ok(())
//! # }
//! ```
//!
//! Timers and listeners run on the tokio runtime captured by the builder, so
//! once built the session may be driven from any thread, including a UI
//! thread that is not a runtime worker. Outside a runtime, pass the handle
//! with [`SyncSessionBuilder::runtime`].

pub mod cross_tab;
pub mod dispatcher;
pub mod edit_state;
pub mod metrics;
pub mod network_monitor;
pub mod realtime;
pub mod router;
pub mod sync_state;

pub use cross_tab::CrossTabSyncBridge;
pub use dispatcher::RefreshDispatcher;
pub use edit_state::{EditStateTracker, EditTiming, RefreshCallback, RefreshOutcome};
pub use metrics::{MetricsSnapshot, SyncMetrics};
pub use network_monitor::{ConnectivityMonitor, ProbeOutcome};
pub use realtime::RealtimeChannelManager;
pub use router::{EventHandler, SubscriptionId, UpdateEventRouter};
pub use sync_state::{ConnectionPhase, ConnectionState, EditPhase, EditState};

use crate::client::feed::ChangeFeed;
use crate::client::probe::ReachabilityProbe;
use crate::client::storage::StorageTab;
use crate::shared::config::SyncConfig;
use crate::shared::error::SyncError;
use crate::shared::event::SyncEvent;
use crate::shared::notification::{Notifier, TracingNotifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// The sync core for one planning view
#[derive(Debug)]
pub struct SyncSession {
    config: SyncConfig,
    router: UpdateEventRouter,
    tracker: EditStateTracker,
    dispatcher: RefreshDispatcher,
    realtime: RealtimeChannelManager,
    monitor: ConnectivityMonitor,
    cross_tab: CrossTabSyncBridge,
    metrics: Arc<SyncMetrics>,
    running: AtomicBool,
}

impl SyncSession {
    pub fn builder() -> SyncSessionBuilder {
        SyncSessionBuilder::default()
    }

    /// Activate every component. Idempotent.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.dispatcher.activate();
        let open = self.realtime.activate();
        self.monitor.activate();
        self.cross_tab.activate();
        tracing::info!(
            "[SYNC] session started: {} of {} channels open",
            open,
            self.config.families.len()
        );
    }

    /// Tear every component down and reset the edit state. Idempotent.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.cross_tab.deactivate();
        self.monitor.deactivate();
        self.realtime.deactivate();
        self.dispatcher.deactivate();
        self.tracker.teardown();
        tracing::info!("[SYNC] session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The user focused a cell
    pub fn edit_start(&self) {
        self.router.publish(SyncEvent::edit_start());
    }

    /// The user left a cell
    pub fn edit_end(&self) {
        self.router.publish(SyncEvent::edit_end());
    }

    /// Manual refresh, still gated by the edit state
    pub fn force_refresh(&self) -> RefreshOutcome {
        self.realtime.force_refresh()
    }

    /// Announce a local write of the planning snapshot
    pub fn trigger_update(&self) {
        self.cross_tab.trigger_update();
    }

    pub fn went_online(&self) {
        self.monitor.went_online();
    }

    pub fn went_offline(&self) {
        self.monitor.went_offline();
    }

    pub fn edit_state(&self) -> EditState {
        self.tracker.state()
    }

    pub fn connection(&self) -> ConnectionState {
        self.monitor.state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.monitor.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn router(&self) -> &UpdateEventRouter {
        &self.router
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn realtime(&self) -> &RealtimeChannelManager {
        &self.realtime
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for [`SyncSession`]
#[derive(Default)]
pub struct SyncSessionBuilder {
    config: Option<SyncConfig>,
    router: Option<UpdateEventRouter>,
    feed: Option<Arc<dyn ChangeFeed>>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    storage: Option<StorageTab>,
    notifier: Option<Arc<dyn Notifier>>,
    on_refresh: Option<RefreshCallback>,
    runtime: Option<Handle>,
}

impl SyncSessionBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing router, e.g. [`UpdateEventRouter::global`]
    pub fn router(mut self, router: UpdateEventRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn feed(mut self, feed: Arc<dyn ChangeFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn storage(mut self, tab: StorageTab) -> Self {
        self.storage = Some(tab);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn on_refresh<F>(mut self, refresh: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_refresh = Some(Arc::new(refresh));
        self
    }

    /// Runtime for the session's timers and listeners. Defaults to the
    /// runtime `build` is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<SyncSession, SyncError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let feed = self.feed.ok_or(SyncError::MissingCollaborator("change feed"))?;
        let probe = self
            .probe
            .ok_or(SyncError::MissingCollaborator("reachability probe"))?;
        let storage = self
            .storage
            .ok_or(SyncError::MissingCollaborator("storage tab"))?;
        let on_refresh = self
            .on_refresh
            .ok_or(SyncError::MissingCollaborator("refresh callback"))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()
                .map_err(|_| SyncError::MissingCollaborator("tokio runtime"))?,
        };
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier));
        let router = self.router.unwrap_or_default();

        let metrics = Arc::new(SyncMetrics::new());
        let tracker = EditStateTracker::with_metrics(
            EditTiming::from(&config),
            on_refresh,
            Arc::clone(&metrics),
            runtime.clone(),
        );
        let dispatcher = RefreshDispatcher::new(
            router.clone(),
            tracker.clone(),
            config.ui_debounce(),
            Arc::clone(&metrics),
            runtime.clone(),
        );
        let realtime = RealtimeChannelManager::new(
            feed,
            router.clone(),
            tracker.clone(),
            Arc::clone(&notifier),
            Arc::clone(&metrics),
            config.families.clone(),
            config.settle_delay(),
            runtime.clone(),
        );
        let monitor = ConnectivityMonitor::new(
            probe,
            Arc::clone(&notifier),
            Arc::clone(&metrics),
            config.poll_interval(),
            config.probe_timeout(),
            runtime.clone(),
        );
        let cross_tab = CrossTabSyncBridge::new(
            storage,
            config.storage_key.clone(),
            router.clone(),
            notifier,
            Arc::clone(&metrics),
            runtime,
        );

        Ok(SyncSession {
            config,
            router,
            tracker,
            dispatcher,
            realtime,
            monitor,
            cross_tab,
            metrics,
            running: AtomicBool::new(false),
        })
    }
}
