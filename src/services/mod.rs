// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - sync and account logic.

pub mod account;
pub mod auth;
pub mod gateway;
pub mod sync;
pub mod watch;

pub use account::AccountService;
pub use auth::{AuthProvider, FirebaseAuth, Session, StaticAuth};
pub use gateway::RemoteAccessGateway;
pub use sync::SyncCoordinator;
pub use watch::{watch_routines, RoutineSnapshot};
