// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Realtime Database client over the REST API.
//!
//! Every location is addressed as `{base_url}/{path}.json`; the signed-in
//! user's ID token is passed as the `auth` query parameter so database rules
//! see the same identity as the mobile SDK would.

use crate::db::{RemoteHandle, RemoteStore};
use crate::error::{StoreError, StoreResult};
use crate::services::auth::AuthProvider;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Realtime Database REST client.
#[derive(Clone)]
pub struct RealtimeDb {
    http: reqwest::Client,
    base_url: String,
    auth: Option<Arc<dyn AuthProvider>>,
}

impl RealtimeDb {
    /// Create a client for the database at `base_url`.
    ///
    /// When `auth` is set, requests carry its current ID token.
    pub fn new(base_url: &str, auth: Option<Arc<dyn AuthProvider>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn url_for(&self, segments: &[String]) -> StoreResult<String> {
        let mut url = self.base_url.clone();
        for segment in segments {
            validate_key(segment)?;
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url.push_str(".json");
        Ok(url)
    }

    async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> StoreResult<reqwest::RequestBuilder> {
        let builder = self.http.request(method, url);
        let token = match &self.auth {
            Some(auth) => auth.id_token().await?,
            None => None,
        };
        Ok(match token {
            Some(token) => builder.query(&[("auth", token)]),
            None => builder,
        })
    }

    async fn get(&self, segments: &[String]) -> StoreResult<Value> {
        let url = self.url_for(segments)?;
        let response = self
            .request(reqwest::Method::GET, &url)
            .await?
            .send()
            .await?;
        let response = check_response(response).await?;
        Ok(response.json::<Value>().await?)
    }

    async fn put(&self, segments: &[String], value: &Value) -> StoreResult<()> {
        let url = self.url_for(segments)?;
        let response = self
            .request(reqwest::Method::PUT, &url)
            .await?
            .query(&[("print", "silent")])
            .json(value)
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RealtimeDb {
    async fn read_all(&self, handle: &RemoteHandle) -> StoreResult<BTreeMap<String, Value>> {
        let value = self.get(handle.segments()).await?;
        let children = children_of(value);
        tracing::debug!(path = %handle, count = children.len(), "Read remote collection");
        Ok(children)
    }

    async fn write_child(
        &self,
        handle: &RemoteHandle,
        key: &str,
        value: &Value,
    ) -> StoreResult<()> {
        self.put(handle.child(key).segments(), value).await
    }

    async fn delete_all(&self, handle: &RemoteHandle) -> StoreResult<()> {
        let url = self.url_for(handle.segments())?;
        let response = self
            .request(reqwest::Method::DELETE, &url)
            .await?
            .send()
            .await?;
        check_response(response).await?;
        tracing::debug!(path = %handle, "Deleted remote collection");
        Ok(())
    }

    async fn read_value(&self, handle: &RemoteHandle) -> StoreResult<Option<Value>> {
        let value = self.get(handle.segments()).await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn write_value(&self, handle: &RemoteHandle, value: &Value) -> StoreResult<()> {
        self.put(handle.segments(), value).await
    }
}

/// Split a location's value into its children.
///
/// A missing location reads as `null`. Locations whose keys are all small
/// integers come back as JSON arrays with `null` holes.
fn children_of(value: Value) -> BTreeMap<String, Value> {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Reject keys the database would refuse or misinterpret as path separators.
fn validate_key(key: &str) -> StoreResult<()> {
    const FORBIDDEN: [char; 6] = ['.', '$', '#', '[', ']', '/'];
    if key.is_empty() || key.chars().any(|c| FORBIDDEN.contains(&c) || c.is_control()) {
        return Err(StoreError(format!("Invalid database key: {:?}", key)));
    }
    Ok(())
}

/// Check response status and surface the database's error text.
async fn check_response(response: reqwest::Response) -> StoreResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    // Errors come back as {"error": "Permission denied"}
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

    tracing::warn!(status = status.as_u16(), error = %message, "Realtime Database request failed");
    Err(StoreError(message))
}
