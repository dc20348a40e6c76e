//! End-to-end ingest runs against MockEventSource + MemoryEventStore.
//! No network, no database.

use std::sync::Arc;

use serde_json::json;

use bsd_client::BsdError;
use turnout_common::FixedClock;
use turnout_ingest::testing::{raw_event, test_now, test_signer, MockEventSource};
use turnout_ingest::{IngestStats, IngestionDriver, ReconciliationEngine};
use turnout_store::MemoryEventStore;

fn driver(source: Arc<MockEventSource>, store: Arc<MemoryEventStore>) -> IngestionDriver {
    let clock = Arc::new(FixedClock(test_now()));
    let engine = ReconciliationEngine::new(store, clock.clone());
    IngestionDriver::new(test_signer(), source, clock, engine)
}

#[tokio::test]
async fn new_event_is_translated_and_created() {
    let source = Arc::new(MockEventSource::with_events(vec![raw_event(json!({
        "original_id": "42",
        "event_id_obfuscated": "abc",
        "name": "Burlington Phonebank",
        "start_dt": "2024-03-01T18:00:00",
        "is_official": "1",
        "capacity": "100",
    }))]));
    let store = Arc::new(MemoryEventStore::new());

    let stats = driver(source.clone(), store.clone()).run().await.unwrap();

    assert_eq!(
        stats,
        IngestStats {
            fetched: 1,
            inserted: 1,
            ..Default::default()
        }
    );

    let stored = store.get("42").unwrap();
    assert_eq!(stored.record.event_id, "42");
    assert!(stored.record.url.ends_with("/abc"));
    assert!(stored.record.is_official);
    assert_eq!(stored.record.capacity, 100);
    assert_eq!(stored.record.event_date, "2024-03-01");
    assert_eq!(stored.timestamp_creation, test_now());
    assert_eq!(store.create_calls(), 1);
    assert_eq!(store.update_calls(), 0);
}

#[tokio::test]
async fn request_is_signed_with_clock_time() {
    let source = Arc::new(MockEventSource::with_events(vec![]));
    let store = Arc::new(MemoryEventStore::new());

    driver(source.clone(), store).run().await.unwrap();

    let urls = source.requested_urls();
    assert_eq!(urls.len(), 1);
    let expected = test_signer().sign_at(test_now().timestamp()).url();
    assert_eq!(urls[0], expected);
    assert!(urls[0].starts_with(
        "https://example.bsd.net/page/api/event/search_events?api_ver=2&api_id=turnout&api_ts="
    ));
}

#[tokio::test]
async fn second_run_updates_instead_of_creating() {
    let event = json!({
        "original_id": "42",
        "name": "Phonebank",
        "capacity": "10",
    });
    let store = Arc::new(MemoryEventStore::new());

    let first = Arc::new(MockEventSource::with_events(vec![raw_event(event.clone())]));
    driver(first, store.clone()).run().await.unwrap();
    let uuid = store.get("42").unwrap().uuid;

    let unchanged = Arc::new(MockEventSource::with_events(vec![raw_event(event)]));
    let stats = driver(unchanged, store.clone()).run().await.unwrap();
    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.inserted, 0);

    let changed = Arc::new(MockEventSource::with_events(vec![raw_event(json!({
        "original_id": "42",
        "name": "Phonebank",
        "capacity": "25",
    }))]));
    let stats = driver(changed, store.clone()).run().await.unwrap();
    assert_eq!(stats.updated, 1);

    let stored = store.get("42").unwrap();
    assert_eq!(stored.uuid, uuid);
    assert_eq!(stored.record.capacity, 25);
    assert_eq!(store.create_calls(), 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn bad_records_are_skipped_without_stopping_the_batch() {
    let source = Arc::new(MockEventSource::with_events(vec![
        raw_event(json!({"original_id": "1", "start_dt": "whenever"})),
        raw_event(json!({"original_id": "2", "start_tz": "Nowhere/Special"})),
        raw_event(json!({"original_id": "13", "name": "Rally"})),
        raw_event(json!({"original_id": "3", "name": "Canvass"})),
    ]));
    let store = Arc::new(MemoryEventStore::new().failing_on("13"));

    let stats = driver(source, store.clone()).run().await.unwrap();

    assert_eq!(stats.fetched, 4);
    assert_eq!(stats.translation_failed, 2);
    assert_eq!(stats.store_failed, 1);
    assert_eq!(stats.inserted, 1);
    assert!(store.get("3").is_some());
    assert!(store.get("13").is_none());
}

#[tokio::test]
async fn events_without_an_identifier_are_skipped_not_merged() {
    let source = Arc::new(MockEventSource::with_events(vec![
        raw_event(json!({"name": "Phonebank A"})),
        raw_event(json!({"name": "Canvass B"})),
        raw_event(json!({"original_id": "7", "name": "Rally"})),
    ]));
    let store = Arc::new(MemoryEventStore::new());

    let stats = driver(source, store.clone()).run().await.unwrap();

    assert_eq!(stats.fetched, 3);
    assert_eq!(stats.translation_failed, 2);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.updated, 0);
    assert_eq!(store.len(), 1);
    assert!(store.get("").is_none());
    assert_eq!(store.create_calls(), 1);
}

#[tokio::test]
async fn fetch_failure_ends_the_run() {
    let source = Arc::new(MockEventSource::failing(BsdError::Auth { status: 401 }));
    let store = Arc::new(MemoryEventStore::new());

    let err = driver(source, store.clone()).run().await.unwrap_err();

    assert!(matches!(err, BsdError::Auth { status: 401 }));
    assert!(store.is_empty());
}

#[tokio::test]
async fn dry_run_translates_without_writing() {
    let source = Arc::new(MockEventSource::with_events(vec![
        raw_event(json!({"original_id": "42", "name": "Phonebank"})),
        raw_event(json!({"original_id": "43", "start_dt": "never"})),
    ]));

    let driver = IngestionDriver::dry_run(test_signer(), source, Arc::new(FixedClock(test_now())));
    let stats = driver.run().await.unwrap();

    assert_eq!(stats.previewed, 1);
    assert_eq!(stats.translation_failed, 1);
    assert_eq!(stats.inserted, 0);
}
