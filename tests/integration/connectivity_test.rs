//! Connectivity transitions and their notifications

use crate::assert_notification_levels;
use crate::common::{SessionHarness, PROBE_LATENCY};
use planning_sync::client::sync::ConnectionPhase;
use planning_sync::shared::NotificationLevel;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_offline_then_online_within_a_second() {
    let h = SessionHarness::started().await;
    assert!(h.session.connection().connected);
    assert_notification_levels!(h, []);

    h.set_reachable(false);
    h.session.went_offline();
    assert_eq!(h.session.connection().phase(), ConnectionPhase::Disconnected);
    sleep(Duration::from_millis(500)).await;

    h.set_reachable(true);
    h.session.went_online();
    sleep(PROBE_LATENCY * 3).await;

    assert!(h.session.connection().connected);
    assert_notification_levels!(h, [NotificationLevel::Error, NotificationLevel::Success]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_polls_do_not_repeat_the_error() {
    let h = SessionHarness::new();
    h.set_reachable(false);
    h.session.start();

    sleep(Duration::from_secs(50)).await;
    assert_eq!(h.probe_count(), 4);
    assert_notification_levels!(h, [NotificationLevel::Error]);

    h.set_reachable(true);
    sleep(Duration::from_secs(15)).await;
    assert_notification_levels!(h, [NotificationLevel::Error, NotificationLevel::Success]);

    let metrics = h.session.metrics();
    assert_eq!(metrics.probes_run, 5);
    assert_eq!(metrics.probes_failed, 4);
}

#[tokio::test(start_paused = true)]
async fn test_offline_signal_while_disconnected_is_quiet() {
    let h = SessionHarness::new();
    h.set_reachable(false);
    h.session.start();
    sleep(PROBE_LATENCY * 2).await;

    h.session.went_offline();
    h.session.went_offline();
    assert_notification_levels!(h, [NotificationLevel::Error]);
}

#[tokio::test(start_paused = true)]
async fn test_online_signal_during_poll_is_dropped() {
    let h = SessionHarness::new();
    h.session.start();
    sleep(PROBE_LATENCY / 2).await;

    // the activation probe is still in flight
    h.session.went_online();
    sleep(PROBE_LATENCY * 3).await;

    assert_eq!(h.probe_count(), 1);
    assert_eq!(h.session.metrics().probes_dropped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_watchers_see_transitions() {
    let h = SessionHarness::started().await;
    let mut rx = h.session.watch_connection();

    h.session.went_offline();
    rx.changed().await.unwrap();
    assert!(!rx.borrow_and_update().connected);

    h.session.went_online();
    sleep(PROBE_LATENCY * 3).await;
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().connected);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_polling() {
    let h = SessionHarness::started().await;
    h.session.stop();

    sleep(Duration::from_secs(60)).await;
    assert_eq!(h.probe_count(), 1);
}
