// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Full-replace synchronization of routines between the device and the
//! remote store.
//!
//! - `download()` replaces the local store with the remote collection.
//! - `upload()` replaces the remote collection with the local store.
//!
//! Neither direction merges. An empty source is refused in both directions
//! so a fresh device or an unseeded account can never wipe the other side.

use crate::db::{LocalStore, RemoteHandle};
use crate::error::{SyncError, SyncOutcome};
use crate::models::{decode_routine, RoutineRecord};
use crate::services::gateway::RemoteAccessGateway;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-scope locks, keyed by remote collection path.
type ScopeLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Held for the duration of one sync call on a scope.
///
/// Dropping it releases the scope and evicts the map entry when no other
/// call holds or waits on it.
struct ScopeGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: ScopeLocks,
    key: String,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Runs `download` and `upload` for the signed-in user.
#[derive(Clone)]
pub struct SyncCoordinator {
    gateway: RemoteAccessGateway,
    local: Arc<dyn LocalStore>,
    scope_locks: ScopeLocks,
}

impl SyncCoordinator {
    pub fn new(gateway: RemoteAccessGateway, local: Arc<dyn LocalStore>) -> Self {
        Self {
            gateway,
            local,
            scope_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn gateway(&self) -> &RemoteAccessGateway {
        &self.gateway
    }

    /// Serialize sync calls on one scope. Calls on other scopes don't wait.
    async fn lock_scope(&self, handle: &RemoteHandle) -> ScopeGuard {
        let key = handle.path();
        let lock = self
            .scope_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ScopeGuard {
            guard: Some(lock.lock_owned().await),
            locks: self.scope_locks.clone(),
            key,
        }
    }

    /// Replace the local routines with the remote collection.
    ///
    /// Remote children that don't decode as routines are skipped. If nothing
    /// usable is left the call fails with `EmptyCloud` and the local store
    /// is not touched.
    pub async fn download(&self) -> SyncOutcome {
        let handle = self
            .gateway
            .routine_collection_handle()
            .ok_or(SyncError::Authentication)?;
        let _guard = self.lock_scope(&handle).await;

        let raw = self.gateway.read_all(&handle).await.map_err(|e| {
            tracing::warn!(path = %handle, error = %e, "Download read failed");
            SyncError::from(e)
        })?;

        let total = raw.len();
        let routines: Vec<RoutineRecord> = raw.values().filter_map(decode_routine).collect();
        if routines.len() < total {
            tracing::debug!(
                path = %handle,
                dropped = total - routines.len(),
                "Skipped undecodable remote routines"
            );
        }

        if routines.is_empty() {
            tracing::info!(path = %handle, "Remote collection empty, keeping local routines");
            return Err(SyncError::EmptyCloud);
        }

        self.local.replace_all(&routines).await.map_err(|e| {
            tracing::warn!(error = %e, "Restoring local routines failed");
            SyncError::from(e)
        })?;

        tracing::info!(path = %handle, count = routines.len(), "Routines downloaded");
        Ok(())
    }

    /// Replace the remote collection with the local routines.
    ///
    /// The remote collection is deleted and then each routine is written
    /// under its `routine_id`, one acknowledged write at a time. A write
    /// failure after the delete leaves the remote partially populated; the
    /// next successful upload repairs it.
    pub async fn upload(&self) -> SyncOutcome {
        let routines = self.local.list().await.map_err(|e| {
            tracing::warn!(error = %e, "Listing local routines failed");
            SyncError::from(e)
        })?;

        if routines.is_empty() {
            tracing::info!("Local store empty, keeping remote routines");
            return Err(SyncError::EmptyLocalDb);
        }

        let handle = self
            .gateway
            .routine_collection_handle()
            .ok_or(SyncError::Authentication)?;

        // Encode everything before the delete so a bad record can't leave
        // the remote collection empty.
        let documents = encode_routines(&routines)?;

        let _guard = self.lock_scope(&handle).await;

        self.gateway.delete_all(&handle).await.map_err(|e| {
            tracing::warn!(path = %handle, error = %e, "Clearing remote routines failed");
            SyncError::from(e)
        })?;

        for (written, (key, document)) in documents.iter().enumerate() {
            self.gateway
                .write_child(&handle, key, document)
                .await
                .map_err(|e| {
                    tracing::error!(
                        path = %handle,
                        written,
                        total = documents.len(),
                        error = %e,
                        "Upload interrupted, remote collection is incomplete"
                    );
                    SyncError::from(e)
                })?;
        }

        tracing::info!(path = %handle, count = documents.len(), "Routines uploaded");
        Ok(())
    }
}

fn encode_routines(routines: &[RoutineRecord]) -> Result<Vec<(String, Value)>, SyncError> {
    routines
        .iter()
        .map(|routine| {
            if routine.routine_id.trim().is_empty() {
                return Err(SyncError::Connection(format!(
                    "Routine {:?} has an empty routineId",
                    routine.name
                )));
            }
            let document = routine
                .to_value()
                .map_err(|e| SyncError::Connection(e.to_string()))?;
            Ok((routine.routine_id.clone(), document))
        })
        .collect()
}
