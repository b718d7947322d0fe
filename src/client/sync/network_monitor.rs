//! # Network Monitor
//!
//! Keeps a best-effort boolean view of backend reachability.
//!
//! ## Features
//!
//! - **Polling**: one probe on activation, then one per poll interval
//! - **Browser Signals**: "online" triggers an immediate probe, "offline"
//!   forces `Disconnected` without waiting for a round-trip
//! - **Quiet Transitions**: only a change of the boolean produces a toast
//! - **Single Flight**: a probe requested while another is running is dropped
//!
//! A probe that times out counts as "not connected". An offline signal bumps
//! the probe generation, so a probe that was already in flight cannot flip
//! the state back to connected when it finally answers.

use crate::client::probe::ReachabilityProbe;
use crate::client::sync::metrics::SyncMetrics;
use crate::client::sync::sync_state::ConnectionState;
use crate::shared::lock;
use crate::shared::notification::{Notification, Notifier};
use chrono::Utc;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Result of one call to [`ConnectivityMonitor::check_now`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Connected,
    Disconnected,
    /// Another probe was already in flight
    Dropped,
    /// An offline signal or teardown arrived while the probe ran
    Superseded,
}

#[derive(Debug, Default)]
struct MonitorInner {
    poller: Option<JoinHandle<()>>,
    in_flight: Option<u64>,
    generation: u64,
}

struct MonitorShared {
    probe: Arc<dyn ReachabilityProbe>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<SyncMetrics>,
    poll_interval: Duration,
    probe_timeout: Duration,
    state: watch::Sender<ConnectionState>,
    runtime: Handle,
    inner: Mutex<MonitorInner>,
}

/// Reachability monitor for the remote backend
#[derive(Clone)]
pub struct ConnectivityMonitor {
    shared: Arc<MonitorShared>,
}

impl fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("state", &self.state())
            .field("poll_interval", &self.shared.poll_interval)
            .finish()
    }
}

impl ConnectivityMonitor {
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<SyncMetrics>,
        poll_interval: Duration,
        probe_timeout: Duration,
        runtime: Handle,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            shared: Arc::new(MonitorShared {
                probe,
                notifier,
                metrics,
                poll_interval,
                probe_timeout,
                state,
                runtime,
                inner: Mutex::new(MonitorInner::default()),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state.borrow().connected
    }

    /// Watch connection state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Start polling: probe now, then every poll interval. Idempotent.
    pub fn activate(&self) {
        let mut inner = lock(&self.shared.inner);
        if inner.poller.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.shared);
        let period = self.shared.poll_interval;
        inner.poller = Some(self.shared.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.check().await;
            }
        }));
        tracing::debug!("[NET] polling every {:?}", period);
    }

    /// Stop polling and abandon any probe in flight. Idempotent.
    pub fn deactivate(&self) {
        self.shared.stop();
    }

    /// Run a probe now unless one is already in flight
    pub async fn check_now(&self) -> ProbeOutcome {
        self.shared.check().await
    }

    /// Browser reported the network is back: probe out of band
    pub fn went_online(&self) {
        tracing::debug!("[NET] browser online signal");
        let shared = Arc::clone(&self.shared);
        self.shared.runtime.spawn(async move {
            shared.check().await;
        });
    }

    /// Browser reported the network is gone: disconnect immediately
    pub fn went_offline(&self) {
        tracing::debug!("[NET] browser offline signal");
        {
            let mut inner = lock(&self.shared.inner);
            inner.generation += 1;
            inner.in_flight = None;
        }
        self.shared
            .apply(false, Some("browser reported offline".to_string()));
    }
}

impl MonitorShared {
    async fn check(&self) -> ProbeOutcome {
        let generation = {
            let mut inner = lock(&self.inner);
            if inner.in_flight.is_some() {
                tracing::trace!("[NET] probe already in flight, dropping request");
                self.metrics.record_probe_dropped();
                return ProbeOutcome::Dropped;
            }
            let generation = inner.generation;
            inner.in_flight = Some(generation);
            generation
        };

        self.state.send_modify(|state| state.checking = true);
        let result = tokio::time::timeout(self.probe_timeout, self.probe.probe()).await;
        let (connected, error) = match result {
            Ok(true) => (true, None),
            Ok(false) => (false, Some("backend unreachable".to_string())),
            Err(_) => (
                false,
                Some(format!("probe timed out after {:?}", self.probe_timeout)),
            ),
        };

        {
            let mut inner = lock(&self.inner);
            if inner.generation != generation {
                tracing::debug!("[NET] discarding probe result from superseded generation");
                return ProbeOutcome::Superseded;
            }
            inner.in_flight = None;
        }

        self.metrics.record_probe(connected);
        self.apply(connected, error);
        if connected {
            ProbeOutcome::Connected
        } else {
            ProbeOutcome::Disconnected
        }
    }

    fn apply(&self, connected: bool, error: Option<String>) {
        let mut changed = false;
        self.state.send_modify(|state| {
            changed = state.connected != connected;
            state.connected = connected;
            state.checking = false;
            state.last_error = error;
            state.last_checked = Some(Utc::now());
        });

        if !changed {
            tracing::trace!("[NET] state confirmed: connected={}", connected);
            return;
        }
        if connected {
            tracing::info!("[NET] connection restored");
            self.notifier
                .notify(Notification::success("Connection to the server restored"));
        } else {
            let reason = self
                .state
                .borrow()
                .last_error
                .clone()
                .unwrap_or_default();
            tracing::warn!("[NET] connection lost: {}", reason);
            self.notifier
                .notify(Notification::error("Connection to the server lost"));
        }
    }

    fn stop(&self) {
        let mut inner = lock(&self.inner);
        if let Some(poller) = inner.poller.take() {
            poller.abort();
            tracing::debug!("[NET] polling stopped");
        }
        inner.generation += 1;
        inner.in_flight = None;
        drop(inner);
        self.state.send_modify(|state| state.checking = false);
    }
}

impl Drop for MonitorShared {
    fn drop(&mut self) {
        if let Some(poller) = lock(&self.inner).poller.take() {
            poller.abort();
        }
    }
}
