//! Persistence contract for session records
//!
//! An [`EventStore`] fetches, inserts and overwrites whole
//! [`PersistedSessionRecord`]s. It has no merge logic; merging happens in
//! [`EventSink`](crate::sink::EventSink).

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::tracking::AnalyticsEvent;

pub use file::FileEventStore;
pub use memory::{MemoryEventStore, StoreOp};

/// Identifier the store assigns to a record on insert
pub type RecordId = String;

/// Key that owns one remote session record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.session_id)
    }
}

/// Remote aggregate of every event flushed for one (user, session) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSessionRecord {
    pub user_id: String,
    pub session_id: String,
    pub events: Vec<AnalyticsEvent>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

impl PersistedSessionRecord {
    /// First record for a session, seeded with its first event
    pub fn first(key: &SessionKey, event: AnalyticsEvent, now: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id.clone(),
            session_id: key.session_id.clone(),
            started_at: event.timestamp,
            events: vec![event],
            last_updated: now,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(&self.user_id, &self.session_id)
    }

    /// Append one event and bump `last_updated`
    pub fn merge(&mut self, event: AnalyticsEvent, now: DateTime<Utc>) {
        self.events.push(event);
        self.last_updated = now;
    }
}

/// A record together with the id the store knows it by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub record: PersistedSessionRecord,
}

/// Abstract session/event store
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fetch the record for (user, session), if one exists
    async fn fetch(&self, key: &SessionKey) -> Result<Option<StoredRecord>, StoreError>;

    /// Insert a new record, returning its id
    async fn insert(&self, record: PersistedSessionRecord) -> Result<RecordId, StoreError>;

    /// Overwrite an existing record by id
    async fn update(&self, id: &RecordId, record: PersistedSessionRecord)
    -> Result<(), StoreError>;
}
