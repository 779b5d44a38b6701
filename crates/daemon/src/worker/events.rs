// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job events as Server-Sent Events.
//!
//! Each observer gets a snapshot first, then live events. An observer that
//! falls behind the broadcast buffer gets a fresh snapshot in place of what
//! it missed.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use mp_core::{Clock, JobEvent};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use super::WorkerState;

pub(super) async fn stream<C: Clock>(
    State(state): State<Arc<WorkerState<C>>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (jobs, rx) = state.jobs().subscribe();
    debug!(jobs = jobs.len(), "event observer connected");

    let service = state.jobs().clone();
    let live = BroadcastStream::new(rx).map(move |item| match item {
        Ok(event) => event,
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            warn!(missed, "event observer lagged, resending snapshot");
            JobEvent::Snapshot { jobs: service.snapshot() }
        }
    });

    let events = tokio_stream::once(JobEvent::Snapshot { jobs }).chain(live).map(|e| to_sse(&e));
    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_sse(event: &JobEvent) -> Result<Event, axum::Error> {
    Event::default().event(event.name()).json_data(event)
}
