use super::*;
use crate::fetcher::ChainSource;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::testing::{ScriptedSource, snapshot_with_strikes};
use chain_client::Error;
use tokio::time::sleep;

const PERIOD: Duration = Duration::from_secs(10);

fn nifty() -> Selector {
    Selector::new("NSE_INDEX|Nifty 50", "2024-06-27")
}

fn controller_on(kv: Arc<dyn KeyValueStore>) -> (Arc<ScriptedSource>, PollingController) {
    let source = Arc::new(ScriptedSource::new());
    let fetcher = ChainFetcher::new(Arc::clone(&source) as Arc<dyn ChainSource>);
    let store = Arc::new(SnapshotStore::new(kv));
    let controller = PollingController::new(fetcher, store, Selector::default(), PERIOD);
    (source, controller)
}

fn controller() -> (Arc<ScriptedSource>, PollingController) {
    controller_on(Arc::new(MemoryStore::new()))
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[tokio::test(start_paused = true)]
async fn test_start_fetches_immediately() {
    let (source, controller) = controller();
    source.push_read(Ok(snapshot_with_strikes(&[17000.0, 17050.0])));

    assert!(controller.start(nifty()).unwrap());
    sleep(millis(1)).await;

    assert!(controller.is_running());
    assert_eq!(source.refresh_count(), 1);
    assert_eq!(source.read_count(), 1);
    assert_eq!(controller.store().latest().unwrap().len(), 2);
    assert!(controller.store().running());
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let (source, controller) = controller();

    assert!(controller.start(nifty()).unwrap());
    assert!(!controller.start(nifty()).unwrap());
    sleep(millis(1)).await;

    assert_eq!(source.refresh_count(), 1);
    sleep(PERIOD).await;
    assert_eq!(source.refresh_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let (_, controller) = controller();

    assert!(!controller.stop());
    controller.start(nifty()).unwrap();
    assert!(controller.stop());
    assert!(!controller.stop());
    assert!(!controller.is_running());
    assert!(!controller.store().running());
}

#[tokio::test(start_paused = true)]
async fn test_empty_expiry_is_refused() {
    let (source, controller) = controller();

    let err = controller
        .start(Selector::new("NSE_INDEX|Nifty 50", ""))
        .unwrap_err();
    sleep(millis(1)).await;

    assert_eq!(err.code(), "INVALID_SELECTOR");
    assert!(!controller.is_running());
    assert_eq!(source.refresh_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cycles_repeat_every_period() {
    let (source, controller) = controller();

    controller.start(nifty()).unwrap();
    sleep(millis(1)).await;
    assert_eq!(source.refresh_count(), 1);

    sleep(PERIOD).await;
    assert_eq!(source.refresh_count(), 2);

    sleep(PERIOD * 2).await;
    assert_eq!(source.refresh_count(), 4);
    assert_eq!(source.read_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_first_tick_prevents_further_cycles() {
    let (source, controller) = controller();

    controller.start(nifty()).unwrap();
    sleep(Duration::from_secs(3)).await;
    controller.stop();
    sleep(Duration::from_secs(30)).await;

    assert_eq!(source.refresh_count(), 1);
    assert_eq!(source.read_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_fetches_immediately() {
    let (source, controller) = controller();

    controller.start(nifty()).unwrap();
    sleep(millis(1)).await;
    controller.stop();
    controller.start(nifty()).unwrap();
    sleep(millis(1)).await;

    assert_eq!(source.refresh_count(), 2);

    // Only the new run's timer fires.
    sleep(PERIOD).await;
    assert_eq!(source.refresh_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_read_keeps_previous_snapshot() {
    let (source, controller) = controller();
    source.push_read(Ok(snapshot_with_strikes(&[17000.0, 17050.0, 17100.0])));
    source.push_read(Err(Error::NoData("no strikes".to_string())));
    source.push_read(Err(Error::Validation("strike 17050 has no put leg".to_string())));

    controller.start(nifty()).unwrap();
    sleep(millis(1)).await;
    let first = controller.store().latest().unwrap();

    sleep(PERIOD * 2).await;

    assert_eq!(source.read_count(), 3);
    assert!(Arc::ptr_eq(&first, &controller.store().latest().unwrap()));
    assert!(controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_polling_survives_failures() {
    let (source, controller) = controller();
    source.push_refresh(Err(Error::Http {
        status: 500,
        message: "Internal Server Error".to_string(),
    }));
    source.push_read(Err(Error::NoData("no strikes".to_string())));
    source.push_read(Ok(snapshot_with_strikes(&[17000.0])));

    controller.start(nifty()).unwrap();
    sleep(millis(1)).await;
    assert!(controller.store().is_empty());

    sleep(PERIOD).await;

    assert_eq!(controller.store().latest().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_selector_read_at_fire_time() {
    let (source, controller) = controller();
    let bank = Selector::new("NSE_INDEX|Nifty Bank", "2024-07-04");

    controller.start(nifty()).unwrap();
    sleep(millis(1)).await;
    controller.set_selector(bank.clone());
    sleep(PERIOD).await;

    let seen = source.selectors();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0], nifty());
    assert_eq!(seen[2], bank);
    assert_eq!(seen[3], bank);
    assert_eq!(controller.store().selector_or(&Selector::default()), bank);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_tick_is_skipped() {
    let (source, controller) = controller();
    source.set_read_delay(Duration::from_secs(25));

    controller.start(nifty()).unwrap();
    sleep(Duration::from_secs(29)).await;
    assert_eq!(source.refresh_count(), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(source.refresh_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_restart_fetches_while_stopped_run_in_flight() {
    let (source, controller) = controller();
    source.set_read_delay(Duration::from_secs(5));

    controller.start(nifty()).unwrap();
    controller.stop();
    controller.start(nifty()).unwrap();
    sleep(millis(1)).await;

    assert_eq!(source.refresh_count(), 2);

    // Both cycles have finished by the first tick.
    sleep(PERIOD).await;
    assert_eq!(source.refresh_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_cycle_completes_after_stop() {
    let (source, controller) = controller();
    source.set_read_delay(Duration::from_secs(2));
    source.push_read(Ok(snapshot_with_strikes(&[17000.0])));

    controller.start(nifty()).unwrap();
    sleep(Duration::from_secs(1)).await;
    controller.stop();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(controller.store().latest().unwrap().len(), 1);
    assert_eq!(source.read_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resume_restarts_persisted_run() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    {
        let (_, controller) = controller_on(Arc::clone(&kv));
        controller.start(nifty()).unwrap();
        sleep(millis(1)).await;
        // Dropped while running, as on a reload.
    }

    let (source, controller) = controller_on(kv);
    assert!(controller.resume(&Selector::default()).unwrap());
    sleep(millis(1)).await;

    assert!(controller.is_running());
    assert_eq!(controller.selector(), nifty());
    assert_eq!(source.refresh_count(), 1);
    assert_eq!(source.read_count(), 1);
    assert_eq!(source.selectors()[0], nifty());
}

#[tokio::test(start_paused = true)]
async fn test_resume_after_stop_does_nothing() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    {
        let (_, controller) = controller_on(Arc::clone(&kv));
        controller.start(nifty()).unwrap();
        controller.stop();
    }

    let (source, controller) = controller_on(kv);
    assert!(!controller.resume(&Selector::default()).unwrap());
    sleep(PERIOD).await;

    assert!(!controller.is_running());
    assert_eq!(source.refresh_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_clear_drops_snapshot() {
    let (source, controller) = controller();
    source.push_read(Ok(snapshot_with_strikes(&[17000.0])));
    controller.start(nifty()).unwrap();
    sleep(millis(1)).await;
    controller.stop();

    controller.clear();

    assert!(controller.store().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_events_broadcast() {
    let (source, controller) = controller();
    source.push_refresh(Err(Error::Http {
        status: 404,
        message: "Role 'Emperor' not found.".to_string(),
    }));
    source.push_read(Ok(snapshot_with_strikes(&[17000.0, 17050.0])));
    let mut events = controller.subscribe();

    controller.start(nifty()).unwrap();
    sleep(millis(1)).await;
    controller.stop();

    assert_eq!(events.recv().await.unwrap(), PollEvent::Started { selector: nifty() });
    assert!(matches!(
        events.recv().await.unwrap(),
        PollEvent::RefreshFailed { message } if message.contains("Role 'Emperor' not found.")
    ));
    assert_eq!(events.recv().await.unwrap(), PollEvent::SnapshotUpdated { strikes: 2 });
    assert_eq!(events.recv().await.unwrap(), PollEvent::Stopped);
}
