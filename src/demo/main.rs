/**
 * Planning Sync Demo
 *
 * Drives one sync session through a scripted planning scenario using the
 * in-process change feed and shared storage, then prints the metrics.
 */
use planning_sync::client::probe::ReachabilityProbe;
use planning_sync::client::{probe_fn, Config, LocalChangeFeed, LocalStorage, SyncSession};
use planning_sync::shared::{ChangeKind, ChangeNotification, NotificationLog, ResourceFamily};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn reachability(config: &Config, up: Arc<AtomicBool>) -> Arc<dyn ReachabilityProbe> {
    #[cfg(feature = "http-probe")]
    {
        if std::env::var("PLANNING_SYNC_DEMO_HTTP").unwrap_or_default() == "1" {
            let probe = planning_sync::client::HttpProbe::from_config(config.sync());
            eprintln!("[STARTUP] Probing {}", probe.url());
            return Arc::new(probe);
        }
    }
    let _ = config;
    Arc::new(probe_fn(move || {
        let reachable = up.load(Ordering::SeqCst);
        async move { reachable }
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = Config::load_or_default()?;
    match config.source() {
        Some(path) => eprintln!("[STARTUP] Config from {}", path.display()),
        None => eprintln!("[STARTUP] Default config"),
    }

    let feed = LocalChangeFeed::new();
    let storage = LocalStorage::new();
    let other_tab = storage.open_tab();
    let backend_up = Arc::new(AtomicBool::new(true));
    let refreshes = Arc::new(AtomicUsize::new(0));
    let notifications = Arc::new(NotificationLog::new());

    let counter = Arc::clone(&refreshes);
    let session = SyncSession::builder()
        .config(config.sync().clone())
        .feed(Arc::new(feed.clone()))
        .probe(reachability(&config, Arc::clone(&backend_up)))
        .storage(storage.open_tab())
        .notifier(notifications.clone())
        .on_refresh(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::info!("[DEMO] planning view reloaded (#{})", n);
        })
        .build()?;
    session.start();
    sleep(Duration::from_millis(100)).await;

    tracing::info!("[DEMO] user starts editing a shift");
    session.edit_start();
    for id in 0..3 {
        feed.emit(ChangeNotification::new(
            ChangeKind::Update,
            ResourceFamily::ScheduleEntries,
            serde_json::json!({ "id": id }),
        ));
    }
    sleep(Duration::from_secs(1)).await;
    tracing::info!("[DEMO] edit state while typing: {:?}", session.edit_state().phase());

    tracing::info!("[DEMO] user leaves the cell");
    session.edit_end();
    sleep(Duration::from_secs(3)).await;

    tracing::info!("[DEMO] another tab saves the planning snapshot");
    other_tab.set(session.config().storage_key.as_str(), r#"{"week":42}"#);
    sleep(Duration::from_secs(1)).await;

    tracing::info!("[DEMO] network drops and comes back");
    backend_up.store(false, Ordering::SeqCst);
    session.went_offline();
    sleep(Duration::from_millis(500)).await;
    backend_up.store(true, Ordering::SeqCst);
    session.went_online();
    sleep(Duration::from_millis(500)).await;

    session.stop();
    for notification in notifications.drain() {
        eprintln!(
            "[TOAST] {} {:?}: {}",
            notification.at.format("%H:%M:%S%.3f"),
            notification.level,
            notification.message
        );
    }
    println!("{}", serde_json::to_string_pretty(&session.metrics())?);
    eprintln!(
        "[DEMO] {} refreshes, connected={}",
        refreshes.load(Ordering::SeqCst),
        session.connection().connected
    );
    Ok(())
}
