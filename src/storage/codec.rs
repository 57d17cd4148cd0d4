//! Encoding of persisted values.

use super::error::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Format used to persist events and other cluster values.
///
/// JSON is readable and the default. Binary (bincode) is compact but tied
/// to field order, so it must only be read back by the same layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCodec {
    #[default]
    Json,
    Binary,
}

impl EventCodec {
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::Json => serde_json::to_vec(value).map_err(|e| StorageError::Encode(e.to_string())),
            Self::Binary => bincode::serialize(value).map_err(|e| StorageError::Encode(e.to_string())),
        }
    }

    /// Decode `bytes` read from `path`; the path is only used for errors.
    pub fn decode<T: DeserializeOwned>(&self, path: &str, bytes: &[u8]) -> Result<T, StorageError> {
        let decoded = match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            Self::Binary => bincode::deserialize(bytes).map_err(|e| e.to_string()),
        };
        decoded.map_err(|message| StorageError::Decode {
            path: path.to_string(),
            message,
        })
    }
}
