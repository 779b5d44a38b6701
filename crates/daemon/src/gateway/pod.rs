// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use mp_adapters::PodProvider;
use mp_core::{Clock, PodReport};

use super::GatewayState;
use crate::error::ApiError;

/// How long a stop waits to copy finished results off the pod.
const FINAL_SYNC_LIMIT: Duration = Duration::from_secs(120);

pub(super) async fn start<P: PodProvider, C: Clock>(
    State(state): State<Arc<GatewayState<P, C>>>,
) -> Result<Json<PodReport>, ApiError> {
    Ok(Json(state.coordinator.start().await?))
}

pub(super) async fn status<P: PodProvider, C: Clock>(
    State(state): State<Arc<GatewayState<P, C>>>,
) -> Result<Json<PodReport>, ApiError> {
    Ok(Json(state.coordinator.status().await?))
}

pub(super) async fn stop<P: PodProvider, C: Clock>(
    State(state): State<Arc<GatewayState<P, C>>>,
) -> Result<Json<PodReport>, ApiError> {
    // Last chance to copy results while the pod still answers.
    state.mirror.sync_serving(state.pods(), FINAL_SYNC_LIMIT).await;
    Ok(Json(state.coordinator.stop().await?))
}
