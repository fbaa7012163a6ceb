//! Storage layer: the local routine store and the remote hierarchical store.

pub mod firestore;
pub mod memory;
pub mod realtime;
pub mod sqlite;

pub use self::firestore::FirestoreDb;
pub use memory::{MemoryLocalStore, MemoryRemoteStore};
pub use realtime::RealtimeDb;
pub use sqlite::SqliteLocalStore;

use crate::error::StoreResult;
use crate::models::RoutineRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Remote path segments as constants.
pub mod paths {
    pub const USER: &str = "User";
    pub const TRAINING: &str = "Training";
    pub const ROUTINES: &str = "RoutineModel";
    pub const EXERCISES: &str = "ExerciseModel";
    pub const SETS: &str = "SetModel";
}

/// Reference to a location in the remote store.
///
/// Building a handle performs no I/O; it is only resolved when passed to a
/// [`RemoteStore`] operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteHandle {
    segments: Vec<String>,
}

impl RemoteHandle {
    pub fn root(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// Handle to a child location.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Slash-joined path, e.g. `Training/abc/RoutineModel`.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Remote hierarchical store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read every child under `handle` in one round trip.
    async fn read_all(&self, handle: &RemoteHandle) -> StoreResult<BTreeMap<String, Value>>;

    /// Create or replace the child `key` under `handle`.
    async fn write_child(&self, handle: &RemoteHandle, key: &str, value: &Value)
        -> StoreResult<()>;

    /// Remove every child under `handle`.
    async fn delete_all(&self, handle: &RemoteHandle) -> StoreResult<()>;

    /// Read the single value stored at `handle`, if any.
    async fn read_value(&self, handle: &RemoteHandle) -> StoreResult<Option<Value>>;

    /// Create or replace the value stored at `handle`.
    async fn write_value(&self, handle: &RemoteHandle, value: &Value) -> StoreResult<()>;
}

/// On-device routine store.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// All routines for the signed-in user, in stored order.
    async fn list(&self) -> StoreResult<Vec<RoutineRecord>>;

    /// Clear the store and insert `records` as one unit.
    ///
    /// Readers must never observe a partially replaced store.
    async fn replace_all(&self, records: &[RoutineRecord]) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_path() {
        let handle = RemoteHandle::root(paths::TRAINING)
            .child("uid-1")
            .child(paths::ROUTINES);
        assert_eq!(handle.path(), "Training/uid-1/RoutineModel");
        assert_eq!(handle.segments().len(), 3);
        assert_eq!(handle.child("r1").to_string(), "Training/uid-1/RoutineModel/r1");
    }
}
