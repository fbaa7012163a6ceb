// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync against the on-device SQLite store.

use routine_sync::db::{LocalStore, MemoryRemoteStore, SqliteLocalStore};
use routine_sync::error::SyncError;
use routine_sync::services::{RemoteAccessGateway, StaticAuth, SyncCoordinator};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

mod common;
use common::{routine, routines_of};

#[tokio::test]
async fn test_download_restores_into_sqlite() {
    let temp_dir = tempdir().unwrap();
    let local = Arc::new(
        SqliteLocalStore::open(&temp_dir.path().join("routines.db"))
            .await
            .unwrap(),
    );
    local.replace_all(&[routine("old", "Old")]).await.unwrap();

    let remote = Arc::new(MemoryRemoteStore::new());
    let mut with_extra = routine("a", "Push");
    with_extra.extra.insert("color".to_string(), json!("#ff0000"));
    remote.seed(&routines_of("u1"), "a", with_extra.to_value().unwrap());
    remote.seed(&routines_of("u1"), "b", routine("b", "Pull").to_value().unwrap());

    let gateway = RemoteAccessGateway::new(Arc::new(StaticAuth::signed_in("u1")), remote);
    let sync = SyncCoordinator::new(gateway, local.clone());

    sync.download().await.unwrap();

    let routines = local.list().await.unwrap();
    assert_eq!(routines, vec![with_extra, routine("b", "Pull")]);
}

#[tokio::test]
async fn test_empty_sqlite_store_refuses_upload() {
    let temp_dir = tempdir().unwrap();
    let local = Arc::new(
        SqliteLocalStore::open(&temp_dir.path().join("routines.db"))
            .await
            .unwrap(),
    );
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.seed(&routines_of("u1"), "a", routine("a", "A").to_value().unwrap());

    let gateway = RemoteAccessGateway::new(Arc::new(StaticAuth::signed_in("u1")), remote.clone());
    let sync = SyncCoordinator::new(gateway, local);

    assert_eq!(sync.upload().await, Err(SyncError::EmptyLocalDb));
    assert_eq!(remote.children(&routines_of("u1")).len(), 1);
}
