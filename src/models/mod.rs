// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod routine;
pub mod user;

pub use routine::{decode_routine, RoutineExercise, RoutineRecord};
pub use user::UserProfile;
