//! Lost-update regression for same-session flushes
//!
//! Two flushes for one session that fetch the same snapshot each write back
//! their own merge, so the second write erases the first event. The
//! serialized sink must never lose an event; the concurrent sink is kept to
//! show the race still exists without it.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use funnel_core::{
    AnalyticsEvent, EventData, EventKind, EventSink, FileEventStore, FlushMode, FlushResult,
    ManualClock, MemoryEventStore, PersistedSessionRecord, SessionKey,
};

fn event(kind: EventKind, ts: i64) -> AnalyticsEvent {
    AnalyticsEvent {
        event: kind,
        page: Some("quiz".to_string()),
        timestamp: DateTime::from_timestamp_millis(ts).unwrap(),
        data: EventData::new(),
        session_id: "s1".to_string(),
        user_id: Some("u1".to_string()),
    }
}

async fn primed_store(key: &SessionKey) -> Arc<MemoryEventStore> {
    let store = MemoryEventStore::new().with_fetch_latency(Duration::from_millis(50));
    let seed = PersistedSessionRecord::first(
        key,
        event(EventKind::PageVisit, 1_000),
        DateTime::from_timestamp_millis(1_000).unwrap(),
    );
    store.prime(seed).await;
    Arc::new(store)
}

async fn submit_pair(mode: FlushMode) -> (Arc<MemoryEventStore>, Vec<FlushResult>) {
    let key = SessionKey::new("u1", "s1");
    let store = primed_store(&key).await;
    let sink = EventSink::new(store.clone(), Arc::new(ManualClock::at_millis(2_000)), mode);
    let mut outcomes = sink.subscribe();

    sink.submit(key.clone(), event(EventKind::UserInteraction, 2_000));
    sink.submit(key.clone(), event(EventKind::FormSubmit, 2_001));
    sink.wait_idle().await;

    let mut results = Vec::new();
    while let Ok(outcome) = outcomes.try_recv() {
        results.push(outcome.result);
    }
    (store, results)
}

#[tokio::test]
async fn concurrent_flushes_lose_an_event() {
    let (store, results) = submit_pair(FlushMode::Concurrent).await;

    // Both flushes report success...
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(FlushResult::is_success));

    // ...but only one of the two new events made it
    let records = store.records_for(&SessionKey::new("u1", "s1")).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].events.len(), 2);
}

#[tokio::test]
async fn serialized_flushes_keep_every_event() {
    let (store, results) = submit_pair(FlushMode::Serialized).await;

    assert_eq!(results.len(), 2);
    assert!(matches!(
        results[1],
        FlushResult::Updated { event_count: 3, .. }
    ));

    let records = store.records_for(&SessionKey::new("u1", "s1")).await;
    assert_eq!(records.len(), 1);
    let kinds: Vec<_> = records[0].events.iter().map(|e| e.event.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::PageVisit,
            EventKind::UserInteraction,
            EventKind::FormSubmit,
        ]
    );
}

#[tokio::test]
async fn concurrent_first_flushes_create_duplicate_records() {
    let store = Arc::new(MemoryEventStore::new().with_fetch_latency(Duration::from_millis(50)));
    let sink = EventSink::new(
        store.clone(),
        Arc::new(ManualClock::at_millis(0)),
        FlushMode::Concurrent,
    );
    let key = SessionKey::new("u1", "s1");

    sink.submit(key.clone(), event(EventKind::PageVisit, 0));
    sink.submit(key.clone(), event(EventKind::PageVisit, 1));
    sink.wait_idle().await;

    assert_eq!(store.records_for(&key).await.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn separate_sessions_flush_in_parallel() {
    let store = Arc::new(MemoryEventStore::new().with_fetch_latency(Duration::from_millis(20)));
    let sink = Arc::new(EventSink::new(
        store.clone(),
        Arc::new(ManualClock::at_millis(0)),
        FlushMode::Serialized,
    ));

    for user in 0..8 {
        for n in 0..3 {
            let key = SessionKey::new(format!("u{}", user), "s1");
            sink.submit(key, event(EventKind::PageVisit, n));
        }
    }
    sink.wait_idle().await;

    assert_eq!(store.len().await, 8);
    for user in 0..8 {
        let records = store
            .records_for(&SessionKey::new(format!("u{}", user), "s1"))
            .await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].events.len(), 3);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_store_survives_parallel_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.json");

    for round in 0..5 {
        let store = Arc::new(FileEventStore::load(&path).await.unwrap());
        let sink = EventSink::new(
            store,
            Arc::new(ManualClock::at_millis(0)),
            FlushMode::Serialized,
        );

        for user in 0..40 {
            let key = SessionKey::new(format!("u{}", user), format!("r{}", round));
            for n in 0..3 {
                sink.submit(key.clone(), event(EventKind::PageVisit, n));
            }
        }
        sink.wait_idle().await;

        let reloaded = FileEventStore::load(&path).await.unwrap();
        let records = reloaded.list().await;
        assert_eq!(records.len(), 40 * (round + 1));
        assert!(records.iter().all(|r| r.record.events.len() == 3));
    }
}
