//! # Edit State Tracker
//!
//! Decides when it is safe to replace on-screen data with a fresh copy.
//! Every refresh producer funnels through [`EditStateTracker::request_refresh`];
//! while the user is editing, requests collapse into a single pending flag that
//! is honored once the edit has really ended.
//!
//! ## Timing
//!
//! ```text
//! EditEnd ──grace (1.5s)──> Idle ──deferred delay (1s)──> refresh callback
//! ```
//!
//! An `EditStart` inside either window cancels it and keeps the pending flag,
//! so the refresh never runs while the user is back in a cell.

use crate::shared::lock;
use crate::client::sync::metrics::SyncMetrics;
use crate::client::sync::sync_state::{EditPhase, EditState};
use crate::shared::config::SyncConfig;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Callback supplied by the view; re-reads the source of truth and redraws
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

/// What happened to a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The callback ran immediately
    Executed,
    /// An edit is in progress; the request raised the pending flag
    Deferred,
    /// A refresh was already pending or scheduled; nothing new was queued
    Coalesced,
}

/// Grace window and deferred-refresh delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditTiming {
    pub grace: Duration,
    pub deferred: Duration,
}

impl Default for EditTiming {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for EditTiming {
    fn from(config: &SyncConfig) -> Self {
        Self {
            grace: config.edit_grace(),
            deferred: config.deferred_refresh(),
        }
    }
}

/// Internal phases; `Closing` and `RefreshScheduled` are the two timed windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Editing,
    Closing,
    RefreshScheduled,
}

#[derive(Debug)]
struct TrackerInner {
    phase: Phase,
    pending_refresh: bool,
    timer: Option<JoinHandle<()>>,
    epoch: u64,
}

impl TrackerInner {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.epoch += 1;
    }

    fn snapshot(&self) -> EditState {
        EditState {
            is_editing: matches!(self.phase, Phase::Editing | Phase::Closing),
            pending_refresh: self.pending_refresh,
        }
    }
}

struct TrackerShared {
    inner: Mutex<TrackerInner>,
    timing: EditTiming,
    on_refresh: RefreshCallback,
    metrics: Arc<SyncMetrics>,
    runtime: Handle,
}

/// Debouncing gate between refresh producers and the view's refresh callback
#[derive(Clone)]
pub struct EditStateTracker {
    shared: Arc<TrackerShared>,
}

impl fmt::Debug for EditStateTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditStateTracker")
            .field("state", &self.state())
            .field("timing", &self.shared.timing)
            .finish()
    }
}

impl EditStateTracker {
    /// Create a tracker that invokes `on_refresh` when a refresh is safe.
    /// Timers run on `runtime`, so the tracker may be driven from any thread.
    pub fn new(timing: EditTiming, on_refresh: RefreshCallback, runtime: Handle) -> Self {
        Self::with_metrics(timing, on_refresh, Arc::new(SyncMetrics::new()), runtime)
    }

    pub fn with_metrics(
        timing: EditTiming,
        on_refresh: RefreshCallback,
        metrics: Arc<SyncMetrics>,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(TrackerShared {
                inner: Mutex::new(TrackerInner {
                    phase: Phase::Idle,
                    pending_refresh: false,
                    timer: None,
                    epoch: 0,
                }),
                timing,
                on_refresh,
                metrics,
                runtime,
            }),
        }
    }

    /// Current edit state
    pub fn state(&self) -> EditState {
        lock(&self.shared.inner).snapshot()
    }

    pub fn phase(&self) -> EditPhase {
        self.state().phase()
    }

    /// The user focused a cell. Idempotent while already editing.
    pub fn edit_start(&self) {
        let mut inner = lock(&self.shared.inner);
        let phase = inner.phase;
        match phase {
            Phase::Editing => {
                tracing::trace!("[EDIT] duplicate edit-start ignored");
            }
            Phase::Idle => {
                inner.phase = Phase::Editing;
                tracing::debug!("[EDIT] editing started");
            }
            Phase::Closing => {
                inner.cancel_timer();
                inner.phase = Phase::Editing;
                tracing::debug!("[EDIT] edit resumed inside grace window");
            }
            Phase::RefreshScheduled => {
                inner.cancel_timer();
                inner.phase = Phase::Editing;
                tracing::debug!("[EDIT] edit resumed, scheduled refresh held back");
            }
        }
    }

    /// The user released the cell. Honored once the grace window lapses.
    /// Idempotent while idle or already inside the grace window.
    pub fn edit_end(&self) {
        let mut inner = lock(&self.shared.inner);
        if inner.phase != Phase::Editing {
            tracing::trace!("[EDIT] edit-end ignored in {:?}", inner.phase);
            return;
        }

        inner.cancel_timer();
        inner.phase = Phase::Closing;
        let epoch = inner.epoch;
        let weak = Arc::downgrade(&self.shared);
        inner.timer = Some(self.shared.runtime.spawn(Self::close_edit(weak, epoch)));
        tracing::debug!(
            "[EDIT] edit ended, grace window {:?} started",
            self.shared.timing.grace
        );
    }

    /// Ask for a refresh. Runs the callback now when idle, otherwise folds the
    /// request into the single pending refresh.
    pub fn request_refresh(&self) -> RefreshOutcome {
        let outcome = {
            let mut inner = lock(&self.shared.inner);
            let pending = inner.pending_refresh;
            let phase = inner.phase;
            match phase {
                Phase::Idle => RefreshOutcome::Executed,
                Phase::RefreshScheduled => RefreshOutcome::Coalesced,
                Phase::Editing | Phase::Closing if pending => RefreshOutcome::Coalesced,
                Phase::Editing | Phase::Closing => {
                    inner.pending_refresh = true;
                    RefreshOutcome::Deferred
                }
            }
        };

        match outcome {
            RefreshOutcome::Executed => {
                tracing::debug!("[EDIT] refresh executed immediately");
                self.shared.run_refresh();
            }
            RefreshOutcome::Deferred => {
                tracing::debug!("[EDIT] refresh deferred until edit ends");
                self.shared.metrics.record_refresh_deferred();
            }
            RefreshOutcome::Coalesced => {
                tracing::trace!("[EDIT] refresh request folded into pending refresh");
                self.shared.metrics.record_refresh_coalesced();
            }
        }
        outcome
    }

    /// Cancel timers and reset to `{false, false}`. Safe to call repeatedly.
    pub fn teardown(&self) {
        let mut inner = lock(&self.shared.inner);
        inner.cancel_timer();
        inner.phase = Phase::Idle;
        inner.pending_refresh = false;
        tracing::debug!("[EDIT] tracker reset");
    }

    async fn close_edit(weak: Weak<TrackerShared>, epoch: u64) {
        let Some(timing) = weak.upgrade().map(|shared| shared.timing) else {
            return;
        };
        tokio::time::sleep(timing.grace).await;

        {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut inner = lock(&shared.inner);
            if inner.epoch != epoch || inner.phase != Phase::Closing {
                return;
            }
            if !inner.pending_refresh {
                inner.phase = Phase::Idle;
                inner.timer = None;
                tracing::debug!("[EDIT] grace window lapsed, idle");
                return;
            }
            inner.phase = Phase::RefreshScheduled;
            tracing::debug!(
                "[EDIT] grace window lapsed, refresh in {:?}",
                timing.deferred
            );
        }

        tokio::time::sleep(timing.deferred).await;

        let Some(shared) = weak.upgrade() else {
            return;
        };
        {
            let mut inner = lock(&shared.inner);
            if inner.epoch != epoch || inner.phase != Phase::RefreshScheduled {
                return;
            }
            inner.phase = Phase::Idle;
            inner.pending_refresh = false;
            inner.timer = None;
        }
        tracing::debug!("[EDIT] running deferred refresh");
        shared.run_refresh();
    }
}

impl TrackerShared {
    fn run_refresh(&self) {
        self.metrics.record_refresh_executed();
        (self.on_refresh)();
    }
}

impl Drop for TrackerShared {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.inner).timer.take() {
            timer.abort();
        }
    }
}
