//! Export and import of item histories.
//!
//! A checkpoint is a self-contained copy of every event of one item. It can
//! be written out as JSON or bincode and restored into the empty history of
//! the same or another item, keeping event ids.

use crate::events::{Event, History};
use crate::storage::ItemPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable copy of a history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryCheckpoint {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// Item the events were recorded against
    pub item: ItemPath,

    /// Every event, ordered by id
    pub events: Vec<Event>,
}

impl HistoryCheckpoint {
    /// Snapshot every event currently stored in `history`.
    pub fn capture(history: &History) -> Result<Self, CheckpointError> {
        let events = history.events()?;
        let checkpoint = Self {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            item: *history.item(),
            events,
        };
        info!(
            checkpoint = %checkpoint.id,
            item = %checkpoint.item,
            events = checkpoint.events.len(),
            "captured history checkpoint"
        );
        Ok(checkpoint)
    }

    /// Check version and id contiguity without touching any history.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        for (expected, event) in (0..).zip(&self.events) {
            if event.id() != Some(expected) {
                return Err(CheckpointError::NonContiguous {
                    expected,
                    found: event.id(),
                });
            }
        }
        Ok(())
    }

    /// Write the checkpointed events into `target`, which must be empty.
    pub fn restore(&self, target: &History) -> Result<(), CheckpointError> {
        self.validate()?;

        let events = target.len()?;
        if events > 0 {
            return Err(CheckpointError::TargetNotEmpty {
                item: *target.item(),
                events,
            });
        }

        target.restore(&self.events)?;
        info!(
            checkpoint = %self.id,
            from = %self.item,
            into = %target.item(),
            events = self.events.len(),
            "restored history checkpoint"
        );
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        serde_json::from_str(json).map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        bincode::deserialize(bytes).map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))
    }
}
