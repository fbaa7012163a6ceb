// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types shared by the sync, auth and storage layers.

/// Failure of a `download()` or `upload()` call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Authentication required")]
    Authentication,

    /// Download found nothing to restore; the local store was left alone.
    #[error("Remote routine collection is empty")]
    EmptyCloud,

    /// Upload found nothing to send; the remote collection was left alone.
    #[error("Local routine store is empty")]
    EmptyLocalDb,

    /// Transport or storage failure. The message is the underlying error text.
    #[error("{0}")]
    Connection(String),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Connection(err.0)
    }
}

/// Outcome of a single sync call.
pub type SyncOutcome = std::result::Result<(), SyncError>;

/// Error reported by a local or remote store collaborator.
///
/// Displays as the raw underlying message so it can be surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<firestore::errors::FirestoreError> for StoreError {
    fn from(err: firestore::errors::FirestoreError) -> Self {
        Self(err.to_string())
    }
}

/// Errors from account operations (sign-in, registration, recovery).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Email and password must not be blank")]
    InvalidInput,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("User profile not found")]
    ProfileMissing,

    #[error("Session expired, sign in again")]
    SessionExpired,

    #[error("{0}")]
    Connection(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Connection(err.0)
    }
}

impl From<AuthError> for StoreError {
    fn from(err: AuthError) -> Self {
        Self(err.to_string())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Connection(err.to_string())
    }
}

/// Result type alias for store collaborators
pub type StoreResult<T> = std::result::Result<T, StoreError>;
