// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication providers.
//!
//! [`AuthProvider`] is the narrow view the sync layer needs: who is signed
//! in, and whether their email is verified. [`FirebaseAuth`] implements it
//! on top of the Identity Toolkit REST API; [`StaticAuth`] is a fixed
//! identity for tests and headless tools.

use crate::error::{AuthError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::RwLock;
use tokio::sync::Mutex;

/// Production Secure Token endpoint, used to refresh ID tokens.
pub const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

/// Refresh this long before the ID token actually expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Ambient authentication state.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// ID of the signed-in user, if any.
    fn current_user_id(&self) -> Option<String>;

    /// Whether the signed-in user has verified their email address.
    fn is_verified(&self) -> bool;

    /// Bearer credential for REST backends, refreshed if it is about to
    /// expire.
    async fn id_token(&self) -> StoreResult<Option<String>> {
        Ok(None)
    }
}

/// Fixed identity.
#[derive(Default)]
pub struct StaticAuth {
    uid: RwLock<Option<String>>,
    verified: bool,
}

impl StaticAuth {
    /// A verified user with the given ID.
    pub fn signed_in(uid: &str) -> Self {
        Self {
            uid: RwLock::new(Some(uid.to_string())),
            verified: true,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Switch the signed-in user (or sign out with `None`).
    pub fn set_user(&self, uid: Option<&str>) {
        *self.uid.write().unwrap_or_else(|e| e.into_inner()) = uid.map(str::to_string);
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    fn current_user_id(&self) -> Option<String> {
        self.uid.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn is_verified(&self) -> bool {
        self.verified && self.current_user_id().is_some()
    }
}

/// A signed-in user.
#[derive(Debug, Clone)]
pub struct Session {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub email_verified: bool,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the ID token should be refreshed before use at `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

/// Secure Token API response (snake_case, unlike Identity Toolkit).
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
}

/// Identity Toolkit error codes that mean "wrong email or password".
const CREDENTIAL_ERRORS: [&str; 5] = [
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_EMAIL",
    "USER_DISABLED",
];

/// Email/password authentication against Firebase Auth.
pub struct FirebaseAuth {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    api_key: String,
    session: RwLock<Option<Session>>,
    /// Serializes token refreshes so concurrent callers share one exchange.
    refresh_lock: Mutex<()>,
}

impl FirebaseAuth {
    /// Create a client for the Identity Toolkit API at `base_url`.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: SECURE_TOKEN_URL.to_string(),
            api_key: api_key.to_string(),
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Use a different Secure Token API base URL.
    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.trim_end_matches('/').to_string();
        self
    }

    /// Current session, if signed in.
    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    /// Sign in with email and password and keep the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let token: TokenResponse = self
            .call(
                "accounts:signInWithPassword",
                json!({"email": email, "password": password, "returnSecureToken": true}),
            )
            .await
            .map_err(|e| match e {
                AuthError::Connection(msg) if is_credential_error(&msg) => {
                    AuthError::InvalidCredentials
                }
                other => other,
            })?;

        let email_verified = self.lookup_verified(&token.id_token).await?;
        let session = session_from(token, email, email_verified);
        self.set_session(Some(session.clone()));

        tracing::info!(uid = %session.uid, email_verified, "Signed in");
        Ok(session)
    }

    /// Create an account and keep the new (unverified) session.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let token: TokenResponse = self
            .call(
                "accounts:signUp",
                json!({"email": email, "password": password, "returnSecureToken": true}),
            )
            .await?;

        let session = session_from(token, email, false);
        self.set_session(Some(session.clone()));

        tracing::info!(uid = %session.uid, "Account created");
        Ok(session)
    }

    /// Send the verification email to the signed-in user.
    pub async fn send_email_verification(&self) -> Result<(), AuthError> {
        let session = self.session().ok_or(AuthError::NotSignedIn)?;
        let _: serde_json::Value = self
            .call(
                "accounts:sendOobCode",
                json!({"requestType": "VERIFY_EMAIL", "idToken": session.id_token}),
            )
            .await?;
        Ok(())
    }

    /// Send a password-reset email.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let _: serde_json::Value = self
            .call(
                "accounts:sendOobCode",
                json!({"requestType": "PASSWORD_RESET", "email": email}),
            )
            .await?;
        Ok(())
    }

    pub fn sign_out(&self) {
        if let Some(session) = self.session() {
            tracing::info!(uid = %session.uid, "Signed out");
        }
        self.set_session(None);
    }

    /// ID token of the current session, exchanging the refresh token first
    /// when the ID token is expired or about to expire.
    pub async fn fresh_id_token(&self) -> Result<Option<String>, AuthError> {
        match self.session() {
            None => return Ok(None),
            Some(session) if !session.needs_refresh(Utc::now()) => {
                return Ok(Some(session.id_token))
            }
            Some(_) => {}
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we were waiting.
        let session = match self.session() {
            None => return Ok(None),
            Some(session) if !session.needs_refresh(Utc::now()) => {
                return Ok(Some(session.id_token))
            }
            Some(session) => session,
        };

        let refresh_token = session.refresh_token.as_deref().ok_or_else(|| {
            tracing::warn!(uid = %session.uid, "ID token expired and no refresh token is held");
            AuthError::SessionExpired
        })?;

        tracing::info!(uid = %session.uid, "ID token expiring, refreshing");
        let refreshed = self.exchange_refresh_token(refresh_token).await?;

        let mut slot = self.session.write().unwrap_or_else(|e| e.into_inner());
        match slot.as_mut() {
            Some(current) if current.uid == refreshed.user_id => {
                current.id_token = refreshed.id_token.clone();
                current.refresh_token = Some(refreshed.refresh_token);
                current.expires_at = expiry_after(Some(&refreshed.expires_in));
                Ok(Some(refreshed.id_token))
            }
            // Signed out or switched user while the exchange was in flight.
            _ => Ok(None),
        }
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshResponse, AuthError> {
        let url = format!("{}/token", self.token_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = identity_error_message(&body)
                .unwrap_or_else(|| format!("HTTP {}: {}", status, body));
            tracing::warn!(status = status.as_u16(), error = %message, "Token refresh failed");
            return Err(AuthError::Connection(message));
        }

        Ok(response.json::<RefreshResponse>().await?)
    }

    async fn lookup_verified(&self, id_token: &str) -> Result<bool, AuthError> {
        let lookup: LookupResponse = self
            .call("accounts:lookup", json!({"idToken": id_token}))
            .await?;
        Ok(lookup.users.first().is_some_and(|u| u.email_verified))
    }

    /// POST to an Identity Toolkit method and decode the JSON response.
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, AuthError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = identity_error_message(&body)
                .unwrap_or_else(|| format!("HTTP {}: {}", status, body));
            tracing::warn!(method, status = status.as_u16(), error = %message, "Identity Toolkit call failed");
            return Err(AuthError::Connection(message));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuth {
    fn current_user_id(&self) -> Option<String> {
        self.session().map(|s| s.uid)
    }

    fn is_verified(&self) -> bool {
        self.session().is_some_and(|s| s.email_verified)
    }

    async fn id_token(&self) -> StoreResult<Option<String>> {
        Ok(self.fresh_id_token().await?)
    }
}

/// Token lifetimes arrive as decimal strings of seconds; default to an hour.
fn expiry_after(expires_in: Option<&str>) -> DateTime<Utc> {
    let lifetime = expires_in
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(3600);
    Utc::now() + Duration::seconds(lifetime)
}

fn session_from(token: TokenResponse, email: &str, email_verified: bool) -> Session {
    Session {
        uid: token.local_id,
        email: if token.email.is_empty() {
            email.to_string()
        } else {
            token.email
        },
        expires_at: expiry_after(token.expires_in.as_deref()),
        id_token: token.id_token,
        refresh_token: token.refresh_token,
        email_verified,
    }
}

/// Pull `error.message` out of an Identity Toolkit error body.
fn identity_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Messages look like `INVALID_PASSWORD` or `TOO_MANY_ATTEMPTS_TRY_LATER : ...`.
fn is_credential_error(message: &str) -> bool {
    let code = message.split(':').next().unwrap_or_default().trim();
    CREDENTIAL_ERRORS.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_auth_switches_user() {
        let auth = StaticAuth::signed_in("u1");
        assert_eq!(auth.current_user_id().as_deref(), Some("u1"));
        assert!(auth.is_verified());

        auth.set_user(None);
        assert_eq!(auth.current_user_id(), None);
        assert!(!auth.is_verified());
        assert_eq!(auth.id_token().await.unwrap(), None);
    }

    #[test]
    fn test_identity_error_message() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
        assert_eq!(identity_error_message(body).as_deref(), Some("EMAIL_EXISTS"));
        assert_eq!(identity_error_message("not json"), None);
    }

    #[test]
    fn test_credential_error_codes() {
        assert!(is_credential_error("INVALID_PASSWORD"));
        assert!(is_credential_error("INVALID_LOGIN_CREDENTIALS"));
        assert!(!is_credential_error(
            "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled"
        ));
    }

    #[test]
    fn test_session_from_falls_back_to_request_email() {
        let token = TokenResponse {
            local_id: "uid-1".to_string(),
            email: String::new(),
            id_token: "tok".to_string(),
            refresh_token: None,
            expires_in: Some("120".to_string()),
        };
        let session = session_from(token, "a@example.com", true);
        assert_eq!(session.email, "a@example.com");
        assert!(session.expires_at > Utc::now());
        assert!(session.expires_at <= Utc::now() + Duration::seconds(120));
        // Inside the refresh margin already.
        assert!(session.needs_refresh(Utc::now()));
    }

    #[test]
    fn test_hour_long_session_does_not_need_refresh() {
        let session = Session {
            uid: "uid-1".to_string(),
            email: "a@example.com".to_string(),
            id_token: "tok".to_string(),
            refresh_token: Some("refresh".to_string()),
            email_verified: true,
            expires_at: expiry_after(Some("3600")),
        };
        assert!(!session.needs_refresh(Utc::now()));
        assert!(session.needs_refresh(Utc::now() + Duration::minutes(56)));
    }
}
