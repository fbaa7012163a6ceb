//! Snapshot stream of the remote routine collection.
//!
//! The stream is lazy: nothing is read until it is polled. Dropping it stops
//! polling, and calling [`watch_routines`] again starts a fresh one.

use crate::error::SyncError;
use crate::models::{decode_routine, RoutineRecord};
use crate::services::gateway::RemoteAccessGateway;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use std::time::Duration;

/// Full view of the remote routine collection at one point in time.
#[derive(Debug, Clone)]
pub struct RoutineSnapshot {
    pub routines: Vec<RoutineRecord>,
    pub taken_at: DateTime<Utc>,
}

struct WatchState {
    gateway: RemoteAccessGateway,
    interval: Duration,
    last: Option<Vec<RoutineRecord>>,
    started: bool,
}

/// Poll the signed-in user's routines every `interval`.
///
/// The first item is emitted right away; after that an item is emitted only
/// when the collection changed or a read failed. Unlike `download()`, an
/// empty collection is a valid snapshot here.
pub fn watch_routines(
    gateway: RemoteAccessGateway,
    interval: Duration,
) -> BoxStream<'static, Result<RoutineSnapshot, SyncError>> {
    let state = WatchState {
        gateway,
        interval,
        last: None,
        started: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.started {
                tokio::time::sleep(state.interval).await;
            }
            state.started = true;

            let routines = match read_snapshot(&state.gateway).await {
                Ok(routines) => routines,
                Err(e) => {
                    // Re-emit the next good snapshot even if it matches the last one.
                    state.last = None;
                    return Some((Err(e), state));
                }
            };

            if state.last.as_ref() == Some(&routines) {
                continue;
            }

            tracing::debug!(count = routines.len(), "Routine snapshot changed");
            state.last = Some(routines.clone());
            let snapshot = RoutineSnapshot {
                routines,
                taken_at: Utc::now(),
            };
            return Some((Ok(snapshot), state));
        }
    })
    .boxed()
}

async fn read_snapshot(gateway: &RemoteAccessGateway) -> Result<Vec<RoutineRecord>, SyncError> {
    let handle = gateway
        .routine_collection_handle()
        .ok_or(SyncError::Authentication)?;
    let raw = gateway.read_all(&handle).await?;
    Ok(raw.values().filter_map(decode_routine).collect())
}
