//! Storage error types.

use thiserror::Error;

/// Errors raised by storage backends and event codecs.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not complete the operation.
    #[error("Storage '{storage}' failed on {path}: {message}")]
    Backend {
        storage: String,
        path: String,
        message: String,
    },

    /// A value could not be encoded for storage.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// A stored value could not be decoded.
    #[error("Decoding {path} failed: {message}")]
    Decode { path: String, message: String },

    /// A lock guarding storage state was poisoned by a panicking writer.
    #[error("Storage lock poisoned")]
    Poisoned,
}
