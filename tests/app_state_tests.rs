// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application wiring from configuration.

use routine_sync::config::Config;
use routine_sync::error::SyncError;
use routine_sync::services::AuthProvider;
use routine_sync::AppState;
use tempfile::tempdir;

#[tokio::test]
async fn test_realtime_state_starts_signed_out() {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::test_default();
    config.local_db_path = temp_dir.path().join("nested").join("routines.db");

    let state = AppState::from_config(config).await.unwrap();

    assert!(state.config.local_db_path.exists());
    assert_eq!(state.auth.current_user_id(), None);
    assert!(state.sync.gateway().routine_collection_handle().is_none());

    // The guards fire before any request reaches the unreachable database.
    assert_eq!(state.sync.download().await, Err(SyncError::Authentication));
    assert_eq!(state.sync.upload().await, Err(SyncError::EmptyLocalDb));
}

#[tokio::test]
async fn test_realtime_backend_requires_database_url() {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::test_default();
    config.local_db_path = temp_dir.path().join("routines.db");
    config.database_url = None;

    let err = AppState::from_config(config).await.err().unwrap();
    assert_eq!(err.to_string(), "FIREBASE_DATABASE_URL is not set");
}
