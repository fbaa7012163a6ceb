// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test --test firestore_integration
//!
//! Each test uses a fresh user ID, so runs don't interfere.

use routine_sync::db::{FirestoreDb, LocalStore, MemoryLocalStore, RemoteHandle, RemoteStore};
use routine_sync::error::SyncError;
use routine_sync::services::{RemoteAccessGateway, StaticAuth, SyncCoordinator};
use serde_json::json;
use std::sync::Arc;

mod common;
use common::{routine, routines_of, unique_uid};

/// Create a test database connection.
async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[tokio::test]
async fn test_write_read_delete_collection() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid();
    let handle = routines_of(&uid);

    // Initially, nothing is stored
    assert!(db.read_all(&handle).await.unwrap().is_empty());

    db.write_child(&handle, "r1", &json!({"routineId": "r1", "name": "Push"}))
        .await
        .unwrap();
    db.write_child(&handle, "r2", &json!({"routineId": "r2", "name": "Pull"}))
        .await
        .unwrap();

    let children = db.read_all(&handle).await.unwrap();
    assert_eq!(children.keys().collect::<Vec<_>>(), vec!["r1", "r2"]);
    assert_eq!(children["r1"]["name"], "Push");

    db.delete_all(&handle).await.unwrap();
    assert!(db.read_all(&handle).await.unwrap().is_empty());

    println!("✓ Collection written, read and cleared: uid={}", uid);
}

#[tokio::test]
async fn test_profile_document_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid();
    let handle = RemoteHandle::root("User").child(uid.clone());

    assert_eq!(db.read_value(&handle).await.unwrap(), None);

    let profile = json!({"uid": uid, "email": "lifter@example.com", "name": "Sam"});
    db.write_value(&handle, &profile).await.unwrap();

    let stored = db.read_value(&handle).await.unwrap().unwrap();
    assert_eq!(stored["email"], "lifter@example.com");
}

#[tokio::test]
async fn test_sync_round_trip_through_firestore() {
    require_emulator!();

    let uid = unique_uid();
    let original = vec![routine("a", "Push"), routine("b", "Pull")];
    let local = Arc::new(MemoryLocalStore::with_routines(original.clone()));
    let gateway = RemoteAccessGateway::new(
        Arc::new(StaticAuth::signed_in(&uid)),
        Arc::new(test_db().await),
    );
    let sync = SyncCoordinator::new(gateway, local.clone());

    // Nothing uploaded yet
    assert_eq!(sync.download().await, Err(SyncError::EmptyCloud));

    sync.upload().await.unwrap();
    local.replace_all(&[routine("scratch", "Scratch")]).await.unwrap();
    sync.download().await.unwrap();

    assert_eq!(local.list().await.unwrap(), original);
    println!("✓ Upload/download round trip: uid={}", uid);
}
