// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable results first, live pod second.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::response::Response;
use mp_adapters::PodProvider;
use mp_core::Clock;
use tracing::debug;

use super::{proxy, GatewayState};
use crate::error::ApiError;
use crate::files;

pub(super) async fn fetch<P: PodProvider, C: Clock>(
    State(state): State<Arc<GatewayState<P, C>>>,
    Path((job_id, file)): Path<(String, String)>,
    req: Request,
) -> Result<Response, ApiError> {
    if let Some(path) = state.results.find(&job_id, &file).await? {
        debug!(job_id, file, "serving durable result");
        return files::serve(&path, &file).await;
    }
    proxy::forward(State(state), req).await
}
