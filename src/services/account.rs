// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account flows: registration, sign-in, password recovery.
//!
//! Sign-in only succeeds for users who verified their email address, and
//! returns the profile stored at `User/{uid}`.

use crate::error::AuthError;
use crate::models::UserProfile;
use crate::services::auth::{AuthProvider, FirebaseAuth};
use crate::services::gateway::RemoteAccessGateway;
use std::sync::Arc;

/// Account operations on top of [`FirebaseAuth`] and the user's profile.
#[derive(Clone)]
pub struct AccountService {
    auth: Arc<FirebaseAuth>,
    gateway: RemoteAccessGateway,
}

impl AccountService {
    /// `gateway` must resolve its scope from the same `auth` instance.
    pub fn new(auth: Arc<FirebaseAuth>, gateway: RemoteAccessGateway) -> Self {
        Self { auth, gateway }
    }

    pub fn auth(&self) -> &Arc<FirebaseAuth> {
        &self.auth
    }

    /// Sign in and load the user's profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(AuthError::InvalidInput);
        }

        let session = self.auth.sign_in(email.trim(), password).await?;
        if !session.email_verified {
            tracing::info!(uid = %session.uid, "Sign-in refused, email not verified");
            self.auth.sign_out();
            return Err(AuthError::EmailNotVerified);
        }

        self.load_profile().await
    }

    /// Create an account, store its seed profile and send the verification email.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(AuthError::InvalidInput);
        }

        let session = self.auth.sign_up(email.trim(), password).await?;

        let handle = self
            .gateway
            .profile_handle()
            .ok_or(AuthError::NotSignedIn)?;
        let profile = serde_json::to_value(UserProfile::seed(&session.uid, &session.email))
            .map_err(|e| AuthError::Connection(e.to_string()))?;
        self.gateway.write_value(&handle, &profile).await?;

        self.auth.send_email_verification().await?;
        tracing::info!(uid = %session.uid, "Registration complete, verification email sent");
        Ok(())
    }

    /// Send a password-reset email.
    pub async fn recover_account(&self, email: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::InvalidInput);
        }
        self.auth.send_password_reset(email.trim()).await
    }

    pub fn logout(&self) {
        self.auth.sign_out();
    }

    /// Profile of the signed-in, verified user.
    pub async fn current_profile(&self) -> Result<UserProfile, AuthError> {
        if self.auth.current_user_id().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        if !self.auth.is_verified() {
            return Err(AuthError::EmailNotVerified);
        }
        self.load_profile().await
    }

    async fn load_profile(&self) -> Result<UserProfile, AuthError> {
        let handle = self
            .gateway
            .profile_handle()
            .ok_or(AuthError::NotSignedIn)?;
        let raw = self
            .gateway
            .read_value(&handle)
            .await?
            .ok_or(AuthError::ProfileMissing)?;

        serde_json::from_value(raw).map_err(|e| {
            tracing::warn!(path = %handle, error = %e, "Stored profile is unreadable");
            AuthError::ProfileMissing
        })
    }
}
