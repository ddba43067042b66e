//! Fire-and-forget merge of tracked events into remote session records
//!
//! Each submitted event is flushed with a fetch-merge-write cycle against
//! the [`EventStore`]:
//!
//! 1. fetch the record for (user, session)
//! 2. if found, append the event, bump `lastUpdated` and overwrite it
//! 3. otherwise insert a new record seeded with the event
//!
//! Nothing is returned to the caller. Failures are logged as warnings and
//! published as [`FlushOutcome`]s on a broadcast channel; there is no retry.
//!
//! In [`FlushMode::Serialized`] every session key gets one worker draining
//! a queue, so flushes for the same session never interleave. In
//! [`FlushMode::Concurrent`] every flush runs as its own task, and two
//! flushes that fetch the same snapshot will lose one of the events.

mod outcome;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::store::{EventStore, PersistedSessionRecord, SessionKey, StoredRecord};
use crate::tracking::AnalyticsEvent;

pub use outcome::{FlushOutcome, FlushResult, FlushStage};

/// Default capacity of the outcome broadcast channel
pub const DEFAULT_OUTCOME_CAPACITY: usize = 256;

/// How flushes for the same session are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// One flush at a time per session key
    #[default]
    Serialized,
    /// Independent read-modify-write per event, no mutual exclusion
    Concurrent,
}

/// State shared between the sink and its flush tasks
struct FlushShared {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    outcomes: broadcast::Sender<FlushOutcome>,
    pending: AtomicUsize,
    idle: Notify,
    /// Senders of live per-session workers; a worker removes its own entry
    /// when it retires
    queues: Mutex<HashMap<SessionKey, mpsc::UnboundedSender<AnalyticsEvent>>>,
}

/// Merges events into the store without blocking the caller
pub struct EventSink {
    shared: Arc<FlushShared>,
    mode: FlushMode,
}

impl EventSink {
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>, mode: FlushMode) -> Self {
        Self::with_capacity(store, clock, mode, DEFAULT_OUTCOME_CAPACITY)
    }

    pub fn with_capacity(
        store: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
        mode: FlushMode,
        outcome_capacity: usize,
    ) -> Self {
        let (outcomes, _) = broadcast::channel(outcome_capacity.max(1));
        Self {
            shared: Arc::new(FlushShared {
                store,
                clock,
                outcomes,
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
                queues: Mutex::new(HashMap::new()),
            }),
            mode,
        }
    }

    pub fn mode(&self) -> FlushMode {
        self.mode
    }

    /// Subscribe to flush outcomes from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FlushOutcome> {
        self.shared.outcomes.subscribe()
    }

    /// Number of submitted flushes that have not finished
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Hand an event off for persistence under `key`
    ///
    /// Returns immediately. Must be called from within a Tokio runtime;
    /// outside one the event is dropped with a warning.
    pub fn submit(&self, key: SessionKey, event: AnalyticsEvent) {
        let Ok(handle) = Handle::try_current() else {
            warn!(session = %key, event = %event.event, "no async runtime, analytics event dropped");
            self.shared.publish(FlushOutcome {
                key,
                event: event.event,
                timestamp: event.timestamp,
                result: FlushResult::Dropped {
                    reason: "no async runtime".to_string(),
                },
            });
            return;
        };

        self.shared.pending.fetch_add(1, Ordering::SeqCst);

        match self.mode {
            FlushMode::Concurrent => {
                let shared = Arc::clone(&self.shared);
                handle.spawn(async move { shared.flush(key, event).await });
            }
            FlushMode::Serialized => self.enqueue(&handle, key, event),
        }
    }

    /// Wait until every submitted flush has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn enqueue(&self, handle: &Handle, key: SessionKey, event: AnalyticsEvent) {
        let mut queues = self.shared.lock_queues();

        let event = match queues.get(&key) {
            Some(tx) => match tx.send(event) {
                Ok(()) => return,
                // Worker is gone; start a fresh one below
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        // rx is alive until the worker below exits, so this cannot fail
        let _ = tx.send(event);
        queues.insert(key.clone(), tx);
        handle.spawn(drain_queue(Arc::clone(&self.shared), key, rx));
    }
}

/// Single writer for one session key
///
/// Exits as soon as its queue runs dry; the next submit for the key starts
/// a fresh worker.
async fn drain_queue(
    shared: Arc<FlushShared>,
    key: SessionKey,
    mut rx: mpsc::UnboundedReceiver<AnalyticsEvent>,
) {
    loop {
        let next = match rx.try_recv() {
            Ok(event) => Some(event),
            Err(_) => shared.retire_if_idle(&key, &mut rx),
        };
        let Some(event) = next else { break };
        shared.flush(key.clone(), event).await;
    }
    debug!(session = %key, "flush queue retired");
}

impl FlushShared {
    fn lock_queues(
        &self,
    ) -> MutexGuard<'_, HashMap<SessionKey, mpsc::UnboundedSender<AnalyticsEvent>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the worker's queue entry unless an event slipped in
    ///
    /// Submitters enqueue under the same lock, so once the entry is gone
    /// every later event goes to a new worker.
    fn retire_if_idle(
        &self,
        key: &SessionKey,
        rx: &mut mpsc::UnboundedReceiver<AnalyticsEvent>,
    ) -> Option<AnalyticsEvent> {
        let mut queues = self.lock_queues();
        match rx.try_recv() {
            Ok(event) => Some(event),
            Err(_) => {
                queues.remove(key);
                None
            }
        }
    }

    async fn flush(&self, key: SessionKey, event: AnalyticsEvent) {
        let kind = event.event.clone();
        let timestamp = event.timestamp;
        let result = self.merge_and_write(&key, event).await;

        match &result {
            FlushResult::Failed { stage, message } => {
                warn!(session = %key, event = %kind, ?stage, error = %message, "analytics flush failed");
            }
            other => {
                debug!(session = %key, event = %kind, result = ?other, "analytics flush complete");
            }
        }

        self.publish(FlushOutcome {
            key,
            event: kind,
            timestamp,
            result,
        });

        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn merge_and_write(&self, key: &SessionKey, event: AnalyticsEvent) -> FlushResult {
        let existing = match self.store.fetch(key).await {
            Ok(existing) => existing,
            Err(e) => return FlushResult::failed(FlushStage::Fetch, e),
        };

        let now = self.clock.now();
        match existing {
            Some(StoredRecord { id, mut record }) => {
                record.merge(event, now);
                let event_count = record.events.len();
                match self.store.update(&id, record).await {
                    Ok(()) => FlushResult::Updated {
                        record_id: id,
                        event_count,
                    },
                    Err(e) => FlushResult::failed(FlushStage::Update, e),
                }
            }
            None => {
                let record = PersistedSessionRecord::first(key, event, now);
                match self.store.insert(record).await {
                    Ok(record_id) => FlushResult::Inserted { record_id },
                    Err(e) => FlushResult::failed(FlushStage::Insert, e),
                }
            }
        }
    }

    fn publish(&self, outcome: FlushOutcome) {
        // No subscribers is fine
        let _ = self.outcomes.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::DateTime;

    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{MemoryEventStore, StoreOp};
    use crate::tracking::{EventData, EventKind};

    fn event(session: &str, ts: i64) -> AnalyticsEvent {
        AnalyticsEvent {
            event: EventKind::PageVisit,
            page: Some("goal".to_string()),
            timestamp: DateTime::from_timestamp_millis(ts).unwrap(),
            data: EventData::new(),
            session_id: session.to_string(),
            user_id: Some("u1".to_string()),
        }
    }

    fn sink(store: Arc<MemoryEventStore>, mode: FlushMode) -> EventSink {
        EventSink::new(store, Arc::new(ManualClock::at_millis(10_000)), mode)
    }

    #[tokio::test]
    async fn first_flush_inserts_record() {
        let store = Arc::new(MemoryEventStore::new());
        let sink = sink(Arc::clone(&store), FlushMode::Serialized);
        let mut outcomes = sink.subscribe();

        sink.submit(SessionKey::new("u1", "s1"), event("s1", 1_000));
        sink.wait_idle().await;

        let outcome = outcomes.recv().await.unwrap();
        assert!(matches!(outcome.result, FlushResult::Inserted { .. }));

        let records = store.records_for(&SessionKey::new("u1", "s1")).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].started_at.timestamp_millis(), 1_000);
        assert_eq!(records[0].last_updated.timestamp_millis(), 10_000);
    }

    #[tokio::test]
    async fn later_flushes_merge_into_existing_record() {
        let store = Arc::new(MemoryEventStore::new());
        let sink = sink(Arc::clone(&store), FlushMode::Serialized);

        for ts in [1_000, 2_000, 3_000] {
            sink.submit(SessionKey::new("u1", "s1"), event("s1", ts));
        }
        sink.wait_idle().await;

        let records = store.records_for(&SessionKey::new("u1", "s1")).await;
        assert_eq!(records.len(), 1);
        let stamps: Vec<i64> = records[0]
            .events
            .iter()
            .map(|e| e.timestamp.timestamp_millis())
            .collect();
        assert_eq!(stamps, vec![1_000, 2_000, 3_000]);
    }

    #[tokio::test]
    async fn store_failures_are_reported_not_raised() {
        let store = Arc::new(MemoryEventStore::new());
        store.fail_next(StoreOp::Fetch).await;
        let sink = sink(Arc::clone(&store), FlushMode::Serialized);
        let mut outcomes = sink.subscribe();

        sink.submit(SessionKey::new("u1", "s1"), event("s1", 1_000));
        sink.wait_idle().await;

        let outcome = outcomes.recv().await.unwrap();
        assert!(matches!(
            outcome.result,
            FlushResult::Failed {
                stage: FlushStage::Fetch,
                ..
            }
        ));
        // The failed write is gone for good
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn sessions_flush_independently() {
        let store = Arc::new(MemoryEventStore::new().with_fetch_latency(Duration::from_millis(5)));
        let sink = sink(Arc::clone(&store), FlushMode::Serialized);

        sink.submit(SessionKey::new("u1", "s1"), event("s1", 1_000));
        sink.submit(SessionKey::new("u2", "s2"), event("s2", 1_000));
        sink.wait_idle().await;

        assert_eq!(store.len().await, 2);
        assert_eq!(sink.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn idle_workers_release_their_queues() {
        let store = Arc::new(MemoryEventStore::new());
        let sink = sink(Arc::clone(&store), FlushMode::Serialized);

        for n in 0..200 {
            let session = format!("s{}", n);
            sink.submit(SessionKey::new("u1", &session), event(&session, 1_000));
            sink.submit(SessionKey::new("u1", &session), event(&session, 2_000));
        }
        sink.wait_idle().await;

        // A worker retires right after its last flush reports done
        tokio::time::timeout(Duration::from_secs(5), async {
            while !sink.shared.lock_queues().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(store.len().await, 200);
    }

    #[tokio::test]
    async fn key_gets_a_new_worker_after_retiring() {
        let store = Arc::new(MemoryEventStore::new());
        let sink = sink(Arc::clone(&store), FlushMode::Serialized);
        let key = SessionKey::new("u1", "s1");

        sink.submit(key.clone(), event("s1", 1_000));
        sink.wait_idle().await;
        while !sink.shared.lock_queues().is_empty() {
            tokio::task::yield_now().await;
        }

        sink.submit(key.clone(), event("s1", 2_000));
        sink.wait_idle().await;

        let records = store.records_for(&key).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].events.len(), 2);
    }

    #[test]
    fn submit_outside_runtime_drops_event() {
        let store = Arc::new(MemoryEventStore::new());
        let sink = sink(store, FlushMode::Concurrent);
        let mut outcomes = sink.subscribe();

        sink.submit(SessionKey::new("u1", "s1"), event("s1", 1_000));

        assert_eq!(sink.pending(), 0);
        let outcome = outcomes.try_recv().unwrap();
        assert!(matches!(outcome.result, FlushResult::Dropped { .. }));
    }

    #[test]
    fn flush_mode_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: FlushMode,
        }
        let parsed: Wrapper = toml::from_str(r#"mode = "concurrent""#).unwrap();
        assert_eq!(parsed.mode, FlushMode::Concurrent);
    }
}
