// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Workout routine model shared by the local store and the remote collection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user-owned workout routine.
///
/// Stored remotely at `Training/{uid}/RoutineModel/{routine_id}`. Fields the
/// sync layer does not know about are carried through `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineRecord {
    /// Stable identity, also the remote child key. Never empty.
    pub routine_id: String,
    #[serde(default)]
    pub name: String,
    /// Exercises in the order the user performs them
    #[serde(default)]
    pub exercises: Vec<RoutineExercise>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One exercise entry inside a routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineExercise {
    #[serde(default)]
    pub exercise_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoutineRecord {
    pub fn new(routine_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            routine_id: routine_id.into(),
            name: name.into(),
            exercises: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Serialize to the JSON document written under the routine's key.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Decode a raw remote child into a routine.
///
/// Returns `None` for anything that is not a well-formed routine with a
/// non-empty `routineId`. Never fails.
pub fn decode_routine(raw: &Value) -> Option<RoutineRecord> {
    if !raw.is_object() {
        return None;
    }
    let record: RoutineRecord = serde_json::from_value(raw.clone()).ok()?;
    if record.routine_id.trim().is_empty() {
        return None;
    }
    Some(record)
}
