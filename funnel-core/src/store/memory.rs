//! In-memory EventStore
//!
//! Holds records in a map behind a RwLock. Latency and one-shot failures can
//! be injected so tests can reproduce interleaved flushes and store outages.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{EventStore, PersistedSessionRecord, RecordId, SessionKey, StoredRecord};
use crate::error::StoreError;

/// Store operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Fetch,
    Insert,
    Update,
}

/// In-memory implementation of EventStore
#[derive(Default)]
pub struct MemoryEventStore {
    records: RwLock<HashMap<RecordId, PersistedSessionRecord>>,
    next_id: AtomicU64,
    /// Delay applied after a fetch has read its snapshot
    fetch_latency: Option<Duration>,
    fail_next: Mutex<HashSet<StoreOp>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch after it has read the record
    ///
    /// Two flushes started together will then both see the same
    /// pre-update state.
    pub fn with_fetch_latency(mut self, latency: Duration) -> Self {
        self.fetch_latency = Some(latency);
        self
    }

    /// Make the next call to `op` fail with [`StoreError::Unavailable`]
    pub async fn fail_next(&self, op: StoreOp) {
        self.fail_next.lock().await.insert(op);
    }

    /// Put a record in place directly, bypassing the trait
    pub async fn prime(&self, record: PersistedSessionRecord) -> RecordId {
        let id = self.allocate_id();
        self.records.write().await.insert(id.clone(), record);
        id
    }

    /// All records for a key, in no particular order
    pub async fn records_for(&self, key: &SessionKey) -> Vec<PersistedSessionRecord> {
        self.records
            .read()
            .await
            .values()
            .filter(|r| &r.key() == key)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn allocate_id(&self) -> RecordId {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn check_failure(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.fail_next.lock().await.remove(&op) {
            return Err(StoreError::Unavailable(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn fetch(&self, key: &SessionKey) -> Result<Option<StoredRecord>, StoreError> {
        self.check_failure(StoreOp::Fetch).await?;

        let found = self
            .records
            .read()
            .await
            .iter()
            .filter(|(_, record)| &record.key() == key)
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(id, record)| StoredRecord {
                id: id.clone(),
                record: record.clone(),
            });

        if let Some(latency) = self.fetch_latency {
            tokio::time::sleep(latency).await;
        }

        Ok(found)
    }

    async fn insert(&self, record: PersistedSessionRecord) -> Result<RecordId, StoreError> {
        self.check_failure(StoreOp::Insert).await?;

        let id = self.allocate_id();
        self.records.write().await.insert(id.clone(), record);
        Ok(id)
    }

    async fn update(
        &self,
        id: &RecordId,
        record: PersistedSessionRecord,
    ) -> Result<(), StoreError> {
        self.check_failure(StoreOp::Update).await?;

        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(StoreError::RecordNotFound(id.clone())),
        }
    }
}
