//! Cross-tab writes reaching a started session

use crate::common::SessionHarness;
use crate::{assert_contains, assert_refreshes};
use planning_sync::client::sync::EditPhase;
use planning_sync::shared::NotificationLevel;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_write_in_other_tab_refreshes_with_toast() {
    let h = SessionHarness::started().await;

    h.write_from_other_tab(r#"{"week":12}"#);
    sleep(Duration::from_millis(400)).await;

    assert_refreshes!(h, 1);
    let toasts = h.notifications.entries();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].level, NotificationLevel::Info);
    assert_contains!(toasts[0].message, "another tab");
    assert_eq!(h.session.metrics().cross_tab_signals, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_key_is_ignored() {
    let h = SessionHarness::started().await;

    h.other_tab.set("sidebar-collapsed", "true");
    sleep(Duration::from_secs(2)).await;

    assert_refreshes!(h, 0);
    assert!(h.notifications.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_trigger_update_refreshes_without_toast() {
    let h = SessionHarness::started().await;

    h.session.trigger_update();
    sleep(Duration::from_millis(400)).await;

    assert_refreshes!(h, 1);
    assert!(h.notifications.entries().is_empty());
    assert_eq!(h.session.metrics().cross_tab_signals, 0);
}

#[tokio::test(start_paused = true)]
async fn test_other_tab_write_waits_for_edit() {
    let h = SessionHarness::started().await;
    h.session.edit_start();

    h.write_from_other_tab("{}");
    sleep(Duration::from_secs(1)).await;
    assert_refreshes!(h, 0);
    assert_eq!(h.session.edit_state().phase(), EditPhase::EditingWithPendingRefresh);

    h.session.edit_end();
    sleep(Duration::from_secs(3)).await;
    assert_refreshes!(h, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_writes_share_one_refresh() {
    let h = SessionHarness::started().await;

    for week in 0..4 {
        h.write_from_other_tab(&format!(r#"{{"week":{}}}"#, week));
        sleep(Duration::from_millis(20)).await;
    }
    sleep(Duration::from_secs(1)).await;

    assert_refreshes!(h, 1);
    assert_eq!(h.notifications.count(NotificationLevel::Info), 4);
}
