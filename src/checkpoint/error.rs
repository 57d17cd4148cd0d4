//! Checkpoint error types.

use crate::error::LifecycleError;
use crate::storage::ItemPath;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Serialization to JSON or binary format failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Checkpoint version is not supported by this version
    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Event ids must run 0, 1, 2, ... without gaps
    #[error("Checkpoint events are not contiguous: expected id {expected}, found {found:?}")]
    NonContiguous { expected: i32, found: Option<i32> },

    /// Only an empty history can be restored into
    #[error("History of {item} already holds {events} events")]
    TargetNotEmpty { item: ItemPath, events: usize },

    /// Reading or writing the history failed
    #[error(transparent)]
    History(#[from] LifecycleError),
}
