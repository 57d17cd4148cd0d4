//! The narrow key/value contract the history log is persisted through.
//!
//! Values are addressed by an item and a slash-delimited path whose first
//! segment names the cluster (`AuditTrail/12` is event 12 of the item's
//! history). Backends store opaque bytes; encoding is the caller's concern
//! (see `EventCodec`).

mod codec;
mod error;
mod memory;

pub use codec::EventCodec;
pub use error::StorageError;
pub use memory::MemoryClusterStorage;

use crate::error::{LifecycleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of a managed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemPath(Uuid);

impl ItemPath {
    /// A fresh random item identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ItemPath {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemPath {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| LifecycleError::InvalidData(format!("Invalid item path '{s}': {e}")))
    }
}

/// Top-level path segments, one per kind of object stored against an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClusterType {
    Property,
    Collection,
    LifeCycle,
    Outcome,
    AuditTrail,
    ViewPoint,
    Job,
}

impl ClusterType {
    pub const ALL: [ClusterType; 7] = [
        Self::Property,
        Self::Collection,
        Self::LifeCycle,
        Self::Outcome,
        Self::AuditTrail,
        Self::ViewPoint,
        Self::Job,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Property => "Property",
            Self::Collection => "Collection",
            Self::LifeCycle => "LifeCycle",
            Self::Outcome => "Outcome",
            Self::AuditTrail => "AuditTrail",
            Self::ViewPoint => "ViewPoint",
            Self::Job => "Job",
        }
    }

    /// Path of `name` within this cluster.
    pub fn path(&self, name: &str) -> String {
        format!("{}/{}", self.as_str(), name)
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value storage partitioned by item.
///
/// Implementations must be safe to share between threads. They provide no
/// ordering across items; the history log serializes its own writes.
pub trait ClusterStorage: Send + Sync {
    /// Human-readable backend name, used in error messages.
    fn name(&self) -> &str;

    fn get(&self, item: &ItemPath, path: &str) -> std::result::Result<Option<Vec<u8>>, StorageError>;

    fn put(&self, item: &ItemPath, path: &str, value: Vec<u8>) -> std::result::Result<(), StorageError>;

    fn delete(&self, item: &ItemPath, path: &str) -> std::result::Result<(), StorageError>;

    /// Names of the direct children of `path`, ordered and deduplicated.
    fn list_children(&self, item: &ItemPath, path: &str) -> std::result::Result<BTreeSet<String>, StorageError>;

    fn exists(&self, item: &ItemPath, path: &str) -> std::result::Result<bool, StorageError> {
        Ok(self.get(item, path)?.is_some())
    }
}
