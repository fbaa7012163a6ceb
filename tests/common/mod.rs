// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use routine_sync::db::{MemoryLocalStore, MemoryRemoteStore, RemoteHandle};
use routine_sync::models::{RoutineExercise, RoutineRecord};
use routine_sync::services::{AuthProvider, RemoteAccessGateway, StaticAuth, SyncCoordinator};
use serde_json::Map;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Generate a unique user ID for test isolation.
#[allow(dead_code)]
pub fn unique_uid() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test-{}", nanos)
}

/// A routine with a couple of exercises.
#[allow(dead_code)]
pub fn routine(id: &str, name: &str) -> RoutineRecord {
    let mut record = RoutineRecord::new(id, name);
    record.exercises = vec![
        RoutineExercise {
            exercise_id: format!("{}-squat", id),
            name: "Squat".to_string(),
            extra: Map::new(),
        },
        RoutineExercise {
            exercise_id: format!("{}-row", id),
            name: "Row".to_string(),
            extra: Map::new(),
        },
    ];
    record
}

/// Remote collection handle for `uid`.
#[allow(dead_code)]
pub fn routines_of(uid: &str) -> RemoteHandle {
    RemoteHandle::root("Training")
        .child(uid)
        .child("RoutineModel")
}

/// In-memory fixture: auth, both stores, and a coordinator over them.
#[allow(dead_code)]
pub struct Fixture {
    pub auth: Arc<StaticAuth>,
    pub remote: Arc<MemoryRemoteStore>,
    pub local: Arc<MemoryLocalStore>,
    pub sync: SyncCoordinator,
}

#[allow(dead_code)]
pub fn fixture(auth: StaticAuth, local: Vec<RoutineRecord>) -> Fixture {
    let auth = Arc::new(auth);
    let remote = Arc::new(MemoryRemoteStore::new());
    let local = Arc::new(MemoryLocalStore::with_routines(local));

    let auth_provider: Arc<dyn AuthProvider> = auth.clone();
    let gateway = RemoteAccessGateway::new(auth_provider, remote.clone());
    let sync = SyncCoordinator::new(gateway, local.clone());

    Fixture {
        auth,
        remote,
        local,
        sync,
    }
}
