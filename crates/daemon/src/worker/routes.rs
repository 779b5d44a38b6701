// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, SecondsFormat};
use mp_core::{Clock, Job, JobId};
use mp_engine::pipeline::PUBLISHED_ARTIFACTS;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::WorkerState;
use crate::error::ApiError;
use crate::files;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubmitRequest {
    #[serde(default)]
    source_ref: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Heartbeat {
    /// Epoch ms
    last_activity: u64,
    last_activity_at: Option<String>,
    uptime_seconds: u64,
    running_jobs: usize,
    queued_jobs: usize,
}

pub(super) async fn submit<C: Clock>(
    State(state): State<Arc<WorkerState<C>>>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let job = state.runner.submit(&body.source_ref)?;
    info!(job_id = %job.id, source = %job.source_ref, "job submitted");
    Ok((StatusCode::CREATED, Json(job)))
}

pub(super) async fn list<C: Clock>(
    State(state): State<Arc<WorkerState<C>>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(state.jobs().list(params.limit)))
}

pub(super) async fn get_job<C: Clock>(
    State(state): State<Arc<WorkerState<C>>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let id = JobId::from(id);
    state.jobs().get(&id).map(Json).ok_or_else(|| ApiError::NotFound(format!("job {id} not found")))
}

pub(super) async fn delete<C: Clock>(
    State(state): State<Arc<WorkerState<C>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.jobs().delete(&JobId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn heartbeat<C: Clock>(
    State(state): State<Arc<WorkerState<C>>>,
) -> Json<Heartbeat> {
    let last_activity = state.last_activity();
    let stats = state.runner.queue().stats();
    Json(Heartbeat {
        last_activity,
        last_activity_at: i64::try_from(last_activity)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        uptime_seconds: state.uptime().as_secs(),
        running_jobs: stats.running,
        queued_jobs: stats.queued,
    })
}

pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Published artifacts first; a job still in flight can be read from its
/// working directory.
pub(super) async fn result<C: Clock>(
    State(state): State<Arc<WorkerState<C>>>,
    Path((job_id, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    if let Some(path) = state.results.find(&job_id, &file).await? {
        return files::serve(&path, &file).await;
    }

    let id = JobId::from(job_id.as_str());
    if PUBLISHED_ARTIFACTS.contains(&file.as_str()) && state.jobs().get(&id).is_some() {
        let path = state.jobs().work_dir(&id).join(&file);
        if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return files::serve(&path, &file).await;
        }
    }
    Err(ApiError::NotFound(format!("no {file} for job {job_id}")))
}
