//! JSON file backed EventStore
//!
//! Keeps all records in memory and rewrites the whole file after every
//! write. Rewrites are serialized and land through a temporary file and a
//! rename, so a reader never sees a torn file. Good enough for local
//! simulation; durability is best-effort.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{EventStore, PersistedSessionRecord, RecordId, SessionKey, StoredRecord};
use crate::error::StoreError;

/// File-backed storage for session records
pub struct FileEventStore {
    records: RwLock<BTreeMap<RecordId, PersistedSessionRecord>>,
    file_path: PathBuf,
    /// Held for the whole snapshot-and-write of one persist
    persist_lock: Mutex<()>,
}

impl FileEventStore {
    /// Load records from `file_path`, or start empty if it does not exist
    pub async fn load(file_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file_path = file_path.as_ref().to_path_buf();

        let records = if fs::try_exists(&file_path).await? {
            let content = fs::read_to_string(&file_path).await?;
            let stored: Vec<StoredRecord> = serde_json::from_str(&content)?;
            stored.into_iter().map(|s| (s.id, s.record)).collect()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            records: RwLock::new(records),
            file_path,
            persist_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Every stored record
    pub async fn list(&self) -> Vec<StoredRecord> {
        self.records
            .read()
            .await
            .iter()
            .map(|(id, record)| StoredRecord {
                id: id.clone(),
                record: record.clone(),
            })
            .collect()
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;
        let list = self.list().await;

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&list)?;
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.file_path).await?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}

#[async_trait]
impl EventStore for FileEventStore {
    async fn fetch(&self, key: &SessionKey) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|(_, record)| &record.key() == key)
            .map(|(id, record)| StoredRecord {
                id: id.clone(),
                record: record.clone(),
            }))
    }

    async fn insert(&self, record: PersistedSessionRecord) -> Result<RecordId, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.records.write().await.insert(id.clone(), record);
        self.persist().await?;
        Ok(id)
    }

    async fn update(
        &self,
        id: &RecordId,
        record: PersistedSessionRecord,
    ) -> Result<(), StoreError> {
        {
            let mut records = self.records.write().await;
            let existing = records
                .get_mut(id)
                .ok_or_else(|| StoreError::RecordNotFound(id.clone()))?;
            *existing = record;
        }
        self.persist().await
    }
}
