//! Flush outcome events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{RecordId, SessionKey};
use crate::tracking::EventKind;

/// Store call that failed during a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushStage {
    Fetch,
    Insert,
    Update,
}

/// What happened to one submitted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlushResult {
    /// A new session record was created
    Inserted { record_id: RecordId },
    /// An existing record was overwritten with the merged event list
    Updated {
        record_id: RecordId,
        event_count: usize,
    },
    /// A store call failed; the event is lost
    Failed { stage: FlushStage, message: String },
    /// The event never reached the store
    Dropped { reason: String },
}

impl FlushResult {
    pub(crate) fn failed(stage: FlushStage, error: StoreError) -> Self {
        Self::Failed {
            stage,
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Inserted { .. } | Self::Updated { .. })
    }
}

/// Published once per submitted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlushOutcome {
    pub key: SessionKey,
    pub event: EventKind,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub result: FlushResult,
}
