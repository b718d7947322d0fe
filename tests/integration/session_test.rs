//! End-to-end edit gating through a started session

use crate::common::SessionHarness;
use crate::{assert_err, assert_refreshes};
use planning_sync::client::sync::{EditPhase, EditState, RefreshOutcome, SyncSession};
use planning_sync::shared::{
    EventSource, NotificationLevel, OriginFlags, ResourceFamily, SyncConfig, SyncError, SyncEvent,
    SyncEventKind,
};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_remote_change_during_edit_waits_for_grace_and_delay() {
    let h = SessionHarness::started().await;

    h.session.edit_start();
    h.emit(ResourceFamily::ScheduleEntries);
    sleep(Duration::from_secs(2)).await;
    assert_refreshes!(h, 0);
    assert_eq!(h.session.edit_state().phase(), EditPhase::EditingWithPendingRefresh);

    h.session.edit_end();
    // grace 1.5s + deferred 1s after edit-end
    sleep(Duration::from_millis(2_400)).await;
    assert_refreshes!(h, 0);

    sleep(Duration::from_millis(200)).await;
    assert_refreshes!(h, 1);
    assert_eq!(h.session.edit_state(), EditState::default());

    sleep(Duration::from_secs(5)).await;
    assert_refreshes!(h, 1);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_five_collapses_into_one_refresh() {
    let h = SessionHarness::started().await;

    for _ in 0..5 {
        assert_eq!(h.emit(ResourceFamily::ScheduleEntries), 1);
        sleep(Duration::from_millis(50)).await;
    }
    sleep(Duration::from_secs(2)).await;

    assert_refreshes!(h, 1);
    let metrics = h.session.metrics();
    assert_eq!(metrics.notifications_received, 5);
    assert_eq!(metrics.refreshes_executed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_change_refreshes_after_settle_and_debounce() {
    let h = SessionHarness::started().await;

    h.emit(ResourceFamily::EmployeeRecords);
    sleep(Duration::from_millis(550)).await;
    assert_refreshes!(h, 0);

    sleep(Duration::from_millis(100)).await;
    assert_refreshes!(h, 1);
    assert_eq!(h.notifications.count(NotificationLevel::Info), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fully_suppressed_event_is_a_no_op() {
    let h = SessionHarness::started().await;
    let flags = OriginFlags {
        no_refresh: true,
        from_sync: true,
    };

    h.session
        .router()
        .publish(SyncEvent::data_changed(flags, EventSource::Local));
    sleep(Duration::from_secs(3)).await;

    assert_refreshes!(h, 0);
    assert!(h.notifications.entries().is_empty());
    assert_eq!(h.session.metrics().events_suppressed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_bookkeeping_only_event_does_not_refresh() {
    let h = SessionHarness::started().await;
    let flags = OriginFlags {
        no_refresh: true,
        from_sync: false,
    };

    h.session
        .router()
        .publish(SyncEvent::data_changed(flags, EventSource::Local));
    sleep(Duration::from_secs(3)).await;

    assert_refreshes!(h, 0);
}

#[tokio::test(start_paused = true)]
async fn test_local_change_still_refreshes() {
    let h = SessionHarness::started().await;

    h.session
        .router()
        .publish(SyncEvent::data_changed(OriginFlags::LOCAL, EventSource::Local));
    sleep(Duration::from_secs(1)).await;

    assert_refreshes!(h, 1);
}

#[tokio::test(start_paused = true)]
async fn test_force_refresh_is_gated_by_edit() {
    let h = SessionHarness::started().await;

    assert_eq!(h.session.force_refresh(), RefreshOutcome::Executed);
    assert_refreshes!(h, 1);

    h.session.edit_start();
    assert_eq!(h.session.force_refresh(), RefreshOutcome::Deferred);
    assert_eq!(h.session.force_refresh(), RefreshOutcome::Coalesced);
    h.session.edit_end();
    sleep(Duration::from_secs(3)).await;

    assert_refreshes!(h, 2);
    let metrics = h.session.metrics();
    assert_eq!(metrics.refreshes_deferred, 1);
    assert_eq!(metrics.refreshes_coalesced, 1);
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_a_cell_holds_the_refresh() {
    let h = SessionHarness::started().await;

    h.session.edit_start();
    h.emit(ResourceFamily::ScheduleEntries);
    sleep(Duration::from_secs(1)).await;
    h.session.edit_end();
    sleep(Duration::from_secs(1)).await;

    // back in a cell before the grace window lapsed
    h.session.edit_start();
    sleep(Duration::from_secs(10)).await;
    assert_refreshes!(h, 0);
    assert_eq!(h.session.edit_state().phase(), EditPhase::EditingWithPendingRefresh);

    h.session.edit_end();
    sleep(Duration::from_secs(3)).await;
    assert_refreshes!(h, 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_edit_signals_are_idempotent() {
    let h = SessionHarness::started().await;

    h.session.edit_end();
    assert_eq!(h.session.edit_state(), EditState::default());

    h.session.edit_start();
    h.session.edit_start();
    assert_eq!(h.session.edit_state().phase(), EditPhase::Editing);

    h.session.edit_end();
    h.session.edit_end();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.session.edit_state(), EditState::default());
    assert_refreshes!(h, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stopped_session_ignores_feed() {
    let h = SessionHarness::started().await;
    h.session.stop();

    assert_eq!(h.emit(ResourceFamily::ScheduleEntries), 0);
    h.write_from_other_tab("{}");
    sleep(Duration::from_secs(2)).await;
    assert_refreshes!(h, 0);
}

#[tokio::test(start_paused = true)]
async fn test_remount_after_subscription_failure() {
    let h = SessionHarness::new();
    h.feed.fail_next_subscribe("socket closed");
    h.session.start();
    assert_eq!(h.feed.active_subscriptions(), 1);
    assert_eq!(h.session.metrics().subscription_failures, 1);

    h.session.stop();
    h.session.start();
    assert_eq!(h.feed.active_subscriptions(), 2);
}

#[test]
fn test_builder_requires_collaborators() {
    let result = SyncSession::builder()
        .config(SyncConfig::default())
        .on_refresh(|| {})
        .build();
    assert_err!(result, SyncError::MissingCollaborator(_));
}

#[test]
fn test_edit_start_from_ui_thread_waits_for_running_dispatch() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let h = {
        let _entered = runtime.enter();
        SessionHarness::new()
    };
    h.session.start();

    let (started_tx, started_rx) = std::sync::mpsc::channel();
    let started_tx = std::sync::Mutex::new(started_tx);
    h.session.router().subscribe(move |event| {
        if event.kind == SyncEventKind::DataChanged {
            started_tx.lock().unwrap().send(()).unwrap();
            std::thread::sleep(Duration::from_millis(200));
        }
    });

    let router = h.session.router().clone();
    let sync_thread = std::thread::spawn(move || {
        router.publish(SyncEvent::synced_change(EventSource::CrossTab));
    });
    started_rx.recv().unwrap();

    h.session.edit_start();
    assert!(h.session.edit_state().is_editing);
    assert_eq!(h.session.force_refresh(), RefreshOutcome::Deferred);
    assert_refreshes!(h, 0);
    sync_thread.join().unwrap();
}
