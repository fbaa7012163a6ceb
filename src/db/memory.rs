// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process stores for tests and offline use.
//!
//! `MemoryRemoteStore` keeps a JSON tree shaped like a hierarchical database,
//! records every call, and can be told to fail specific operations.
//! `MemoryLocalStore` swaps its whole contents under a write lock.

use crate::db::{LocalStore, RemoteHandle, RemoteStore};
use crate::error::{StoreError, StoreResult};
use crate::models::RoutineRecord;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// A call observed by [`MemoryRemoteStore`], with the handle path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    ReadAll(String),
    WriteChild(String, String),
    DeleteAll(String),
    ReadValue(String),
    WriteValue(String),
}

#[derive(Default)]
struct Faults {
    read: Option<String>,
    delete: Option<String>,
    /// Writes fail once this many have succeeded
    write: Option<(usize, String)>,
}

struct RemoteInner {
    root: Value,
    calls: Vec<RemoteCall>,
    writes_ok: usize,
    faults: Faults,
}

/// Hierarchical remote store held in memory.
pub struct MemoryRemoteStore {
    inner: Mutex<RemoteInner>,
    latency: Mutex<Option<Duration>>,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RemoteInner {
                root: Value::Object(Map::new()),
                calls: Vec::new(),
                writes_ok: 0,
                faults: Faults::default(),
            }),
            latency: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RemoteInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `value` under `handle/key` without recording a call.
    pub fn seed(&self, handle: &RemoteHandle, key: &str, value: Value) {
        let mut inner = self.lock();
        let node = node_mut(&mut inner.root, handle.segments());
        ensure_object(node).insert(key.to_string(), value);
    }

    /// Current children under `handle`, without recording a call.
    pub fn children(&self, handle: &RemoteHandle) -> BTreeMap<String, Value> {
        let inner = self.lock();
        node(&inner.root, handle.segments())
            .map(children_of)
            .unwrap_or_default()
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Make every `read_all` fail with `msg`.
    pub fn fail_reads(&self, msg: &str) {
        self.lock().faults.read = Some(msg.to_string());
    }

    /// Make every `delete_all` fail with `msg`.
    pub fn fail_deletes(&self, msg: &str) {
        self.lock().faults.delete = Some(msg.to_string());
    }

    /// Let `successes` more writes through, then fail every write with `msg`.
    pub fn fail_writes_after(&self, successes: usize, msg: &str) {
        let mut inner = self.lock();
        let limit = inner.writes_ok + successes;
        inner.faults.write = Some((limit, msg.to_string()));
    }

    pub fn clear_faults(&self) {
        self.lock().faults = Faults::default();
    }

    /// Delay every operation by `latency` before it touches the tree.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = Some(latency);
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn write_at(&self, segments: &[String], call: RemoteCall, value: &Value) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.calls.push(call);
        if let Some((limit, msg)) = &inner.faults.write {
            if inner.writes_ok >= *limit {
                return Err(StoreError::new(msg.clone()));
            }
        }
        if let Some((last, parents)) = segments.split_last() {
            let parent = node_mut(&mut inner.root, parents);
            ensure_object(parent).insert(last.clone(), value.clone());
        }
        inner.writes_ok += 1;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn read_all(&self, handle: &RemoteHandle) -> StoreResult<BTreeMap<String, Value>> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::ReadAll(handle.path()));
        if let Some(msg) = &inner.faults.read {
            return Err(StoreError::new(msg.clone()));
        }
        Ok(node(&inner.root, handle.segments())
            .map(children_of)
            .unwrap_or_default())
    }

    async fn write_child(
        &self,
        handle: &RemoteHandle,
        key: &str,
        value: &Value,
    ) -> StoreResult<()> {
        self.simulate_latency().await;
        let target = handle.child(key);
        self.write_at(
            target.segments(),
            RemoteCall::WriteChild(handle.path(), key.to_string()),
            value,
        )
    }

    async fn delete_all(&self, handle: &RemoteHandle) -> StoreResult<()> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::DeleteAll(handle.path()));
        if let Some(msg) = &inner.faults.delete {
            return Err(StoreError::new(msg.clone()));
        }
        if let Some((last, parents)) = handle.segments().split_last() {
            let parent = node_mut(&mut inner.root, parents);
            ensure_object(parent).remove(last);
        }
        Ok(())
    }

    async fn read_value(&self, handle: &RemoteHandle) -> StoreResult<Option<Value>> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::ReadValue(handle.path()));
        if let Some(msg) = &inner.faults.read {
            return Err(StoreError::new(msg.clone()));
        }
        Ok(node(&inner.root, handle.segments())
            .filter(|v| !v.is_null())
            .cloned())
    }

    async fn write_value(&self, handle: &RemoteHandle, value: &Value) -> StoreResult<()> {
        self.simulate_latency().await;
        self.write_at(
            handle.segments(),
            RemoteCall::WriteValue(handle.path()),
            value,
        )
    }
}

fn node<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |cur, segment| cur.as_object()?.get(segment))
}

fn node_mut<'a>(root: &'a mut Value, segments: &[String]) -> &'a mut Value {
    let mut cur = root;
    for segment in segments {
        cur = ensure_object(cur)
            .entry(segment.clone())
            .or_insert(Value::Null);
    }
    cur
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

fn children_of(value: &Value) -> BTreeMap<String, Value> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => BTreeMap::new(),
    }
}

/// Local routine store held in memory.
#[derive(Default)]
pub struct MemoryLocalStore {
    routines: tokio::sync::RwLock<Vec<RoutineRecord>>,
    list_fault: Mutex<Option<String>>,
    replace_fault: Mutex<Option<String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routines(routines: Vec<RoutineRecord>) -> Self {
        Self {
            routines: tokio::sync::RwLock::new(routines),
            ..Default::default()
        }
    }

    pub fn fail_list(&self, msg: &str) {
        *self.list_fault.lock().unwrap_or_else(|e| e.into_inner()) = Some(msg.to_string());
    }

    pub fn fail_replace(&self, msg: &str) {
        *self.replace_fault.lock().unwrap_or_else(|e| e.into_inner()) = Some(msg.to_string());
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn list(&self) -> StoreResult<Vec<RoutineRecord>> {
        let fault = self
            .list_fault
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(msg) = fault {
            return Err(StoreError::new(msg));
        }
        Ok(self.routines.read().await.clone())
    }

    async fn replace_all(&self, records: &[RoutineRecord]) -> StoreResult<()> {
        let fault = self
            .replace_fault
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(msg) = fault {
            return Err(StoreError::new(msg));
        }
        *self.routines.write().await = records.to_vec();
        Ok(())
    }
}
