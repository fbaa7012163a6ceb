// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scoped access to the remote store.
//!
//! Every remote location a user can touch lives under their own user ID.
//! The gateway turns the ambient sign-in state into handles for those
//! locations and runs store operations on them with an optional deadline.

use crate::db::{paths, RemoteHandle, RemoteStore};
use crate::error::{StoreError, StoreResult};
use crate::services::auth::AuthProvider;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Resolves the signed-in user's scope and performs scoped remote I/O.
#[derive(Clone)]
pub struct RemoteAccessGateway {
    auth: Arc<dyn AuthProvider>,
    remote: Arc<dyn RemoteStore>,
    timeout: Option<Duration>,
}

impl RemoteAccessGateway {
    pub fn new(auth: Arc<dyn AuthProvider>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            auth,
            remote,
            timeout: None,
        }
    }

    /// Apply `timeout` to every remote round trip (`None` disables it).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The signed-in user's ID, if any.
    pub fn scope(&self) -> Option<String> {
        self.auth.current_user_id().filter(|uid| !uid.is_empty())
    }

    fn training(&self) -> Option<RemoteHandle> {
        self.scope()
            .map(|uid| RemoteHandle::root(paths::TRAINING).child(uid))
    }

    /// `Training/{uid}/RoutineModel`, or `None` when nobody is signed in.
    pub fn routine_collection_handle(&self) -> Option<RemoteHandle> {
        self.training().map(|h| h.child(paths::ROUTINES))
    }

    /// `Training/{uid}/ExerciseModel`
    pub fn exercise_collection_handle(&self) -> Option<RemoteHandle> {
        self.training().map(|h| h.child(paths::EXERCISES))
    }

    /// `Training/{uid}/ExerciseModel/{exercise_id}/SetModel`
    pub fn sets_handle(&self, exercise_id: &str) -> Option<RemoteHandle> {
        self.exercise_collection_handle()
            .map(|h| h.child(exercise_id).child(paths::SETS))
    }

    /// `User/{uid}`
    pub fn profile_handle(&self) -> Option<RemoteHandle> {
        self.scope().map(|uid| RemoteHandle::root(paths::USER).child(uid))
    }

    pub async fn read_all(&self, handle: &RemoteHandle) -> StoreResult<BTreeMap<String, Value>> {
        self.with_deadline(self.remote.read_all(handle)).await
    }

    pub async fn write_child(
        &self,
        handle: &RemoteHandle,
        key: &str,
        value: &Value,
    ) -> StoreResult<()> {
        self.with_deadline(self.remote.write_child(handle, key, value))
            .await
    }

    pub async fn delete_all(&self, handle: &RemoteHandle) -> StoreResult<()> {
        self.with_deadline(self.remote.delete_all(handle)).await
    }

    pub async fn read_value(&self, handle: &RemoteHandle) -> StoreResult<Option<Value>> {
        self.with_deadline(self.remote.read_value(handle)).await
    }

    pub async fn write_value(&self, handle: &RemoteHandle, value: &Value) -> StoreResult<()> {
        self.with_deadline(self.remote.write_value(handle, value))
            .await
    }

    async fn with_deadline<T>(&self, fut: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                tracing::warn!(timeout = ?limit, "Remote request timed out");
                StoreError(format!(
                    "Remote request timed out after {}s",
                    limit.as_secs_f64()
                ))
            })?,
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRemoteStore;
    use crate::services::auth::StaticAuth;

    fn gateway(auth: StaticAuth) -> RemoteAccessGateway {
        RemoteAccessGateway::new(Arc::new(auth), Arc::new(MemoryRemoteStore::new()))
    }

    #[test]
    fn test_handles_for_signed_in_user() {
        let gateway = gateway(StaticAuth::signed_in("abc"));

        assert_eq!(
            gateway.routine_collection_handle().unwrap().path(),
            "Training/abc/RoutineModel"
        );
        assert_eq!(
            gateway.exercise_collection_handle().unwrap().path(),
            "Training/abc/ExerciseModel"
        );
        assert_eq!(
            gateway.sets_handle("e7").unwrap().path(),
            "Training/abc/ExerciseModel/e7/SetModel"
        );
        assert_eq!(gateway.profile_handle().unwrap().path(), "User/abc");
    }

    #[test]
    fn test_no_handles_when_signed_out() {
        let gateway = gateway(StaticAuth::signed_out());
        assert!(gateway.routine_collection_handle().is_none());
        assert!(gateway.sets_handle("e1").is_none());
        assert!(gateway.profile_handle().is_none());
    }

    #[test]
    fn test_empty_uid_is_no_scope() {
        let gateway = gateway(StaticAuth::signed_in(""));
        assert!(gateway.scope().is_none());
        assert!(gateway.routine_collection_handle().is_none());
    }

    #[test]
    fn test_handle_follows_current_user() {
        let auth = Arc::new(StaticAuth::signed_in("first"));
        let gateway = RemoteAccessGateway::new(auth.clone(), Arc::new(MemoryRemoteStore::new()));

        assert_eq!(
            gateway.routine_collection_handle().unwrap().path(),
            "Training/first/RoutineModel"
        );
        auth.set_user(Some("second"));
        assert_eq!(
            gateway.routine_collection_handle().unwrap().path(),
            "Training/second/RoutineModel"
        );
    }

    #[tokio::test]
    async fn test_deadline_surfaces_as_store_error() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.set_latency(Duration::from_millis(200));
        let gateway = RemoteAccessGateway::new(Arc::new(StaticAuth::signed_in("u1")), remote)
            .with_timeout(Some(Duration::from_millis(20)));

        let handle = gateway.routine_collection_handle().unwrap();
        let err = gateway.read_all(&handle).await.unwrap_err();
        assert_eq!(err.to_string(), "Remote request timed out after 0.02s");
    }
}
