//! # Sync Metrics
//!
//! Counters for what the sync core did with the signals it received.
//!
//! ## Features
//!
//! - **Refresh Accounting**: executed, deferred and coalesced refresh requests
//! - **Feed Activity**: realtime notifications and cross-tab signals
//! - **Probe Health**: probes run, failed and dropped by the in-flight guard

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SyncMetrics {
    refreshes_executed: AtomicU64,
    refreshes_deferred: AtomicU64,
    refreshes_coalesced: AtomicU64,
    notifications_received: AtomicU64,
    events_suppressed: AtomicU64,
    cross_tab_signals: AtomicU64,
    subscription_failures: AtomicU64,
    probes_run: AtomicU64,
    probes_failed: AtomicU64,
    probes_dropped: AtomicU64,
}

/// Point-in-time copy of [`SyncMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub refreshes_executed: u64,
    pub refreshes_deferred: u64,
    pub refreshes_coalesced: u64,
    pub notifications_received: u64,
    pub events_suppressed: u64,
    pub cross_tab_signals: u64,
    pub subscription_failures: u64,
    pub probes_run: u64,
    pub probes_failed: u64,
    pub probes_dropped: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_refresh_executed(&self) {
        bump(&self.refreshes_executed);
    }

    pub fn record_refresh_deferred(&self) {
        bump(&self.refreshes_deferred);
    }

    pub fn record_refresh_coalesced(&self) {
        bump(&self.refreshes_coalesced);
    }

    pub fn record_notification(&self) {
        bump(&self.notifications_received);
    }

    pub fn record_suppressed(&self) {
        bump(&self.events_suppressed);
    }

    pub fn record_cross_tab_signal(&self) {
        bump(&self.cross_tab_signals);
    }

    pub fn record_subscription_failure(&self) {
        bump(&self.subscription_failures);
    }

    /// Record a completed probe
    pub fn record_probe(&self, connected: bool) {
        bump(&self.probes_run);
        if !connected {
            bump(&self.probes_failed);
        }
    }

    pub fn record_probe_dropped(&self) {
        bump(&self.probes_dropped);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            refreshes_executed: self.refreshes_executed.load(Ordering::Relaxed),
            refreshes_deferred: self.refreshes_deferred.load(Ordering::Relaxed),
            refreshes_coalesced: self.refreshes_coalesced.load(Ordering::Relaxed),
            notifications_received: self.notifications_received.load(Ordering::Relaxed),
            events_suppressed: self.events_suppressed.load(Ordering::Relaxed),
            cross_tab_signals: self.cross_tab_signals.load(Ordering::Relaxed),
            subscription_failures: self.subscription_failures.load(Ordering::Relaxed),
            probes_run: self.probes_run.load(Ordering::Relaxed),
            probes_failed: self.probes_failed.load(Ordering::Relaxed),
            probes_dropped: self.probes_dropped.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    pub fn probe_success_rate(&self) -> f64 {
        if self.probes_run == 0 {
            0.0
        } else {
            (self.probes_run - self.probes_failed) as f64 / self.probes_run as f64
        }
    }
}
