// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Routine-Sync: account and workout-routine sync layer
//!
//! This crate provides email/password accounts with email verification and
//! full-replace synchronization of workout routines between an on-device
//! store and a remote hierarchical database.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use config::{Config, RemoteBackend};
use db::{FirestoreDb, LocalStore, RealtimeDb, RemoteStore, SqliteLocalStore};
use error::StoreError;
use services::{AccountService, AuthProvider, FirebaseAuth, RemoteAccessGateway, SyncCoordinator};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub auth: Arc<FirebaseAuth>,
    pub accounts: AccountService,
    pub sync: SyncCoordinator,
}

impl AppState {
    /// Wire up the configured backends.
    pub async fn from_config(config: Config) -> Result<Self, StoreError> {
        let auth = Arc::new(
            FirebaseAuth::new(&config.identity_base_url, &config.firebase_api_key)
                .with_token_url(&config.secure_token_url),
        );
        let auth_provider: Arc<dyn AuthProvider> = auth.clone();

        let remote: Arc<dyn RemoteStore> = match config.remote_backend {
            RemoteBackend::Realtime => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| StoreError::new("FIREBASE_DATABASE_URL is not set"))?;
                tracing::info!(url, "Using Realtime Database backend");
                Arc::new(RealtimeDb::new(url, Some(auth_provider.clone())))
            }
            RemoteBackend::Firestore => {
                tracing::info!(project = %config.gcp_project_id, "Using Firestore backend");
                Arc::new(FirestoreDb::new(&config.gcp_project_id).await?)
            }
        };

        let local: Arc<dyn LocalStore> =
            Arc::new(SqliteLocalStore::open(&config.local_db_path).await?);
        tracing::info!(path = %config.local_db_path.display(), "Local routine store opened");

        let gateway =
            RemoteAccessGateway::new(auth_provider, remote).with_timeout(config.sync_timeout);

        Ok(Self {
            accounts: AccountService::new(auth.clone(), gateway.clone()),
            sync: SyncCoordinator::new(gateway, local),
            auth,
            config,
        })
    }
}
