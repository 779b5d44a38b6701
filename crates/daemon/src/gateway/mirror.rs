// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result mirror: copies the artifacts of completed jobs off the pod into
//! the gateway's own store, so they stay downloadable once the pod stops.

use std::time::Duration;

use futures_util::StreamExt;
use mp_core::{Job, JobStatus};
use mp_storage::{PodDirectory, ResultError, ResultStore};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::worker::MIRROR_HEADER;

/// Jobs scanned per pass, most recent first.
const SCAN_LIMIT: usize = 50;

/// Upper bound on one periodic pass; large videos take a while.
const PASS_LIMIT: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("pod request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("pod answered {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error(transparent)]
    Store(#[from] ResultError),
    #[error("mirror pass exceeded {}s", .0.as_secs())]
    TimedOut(Duration),
}

#[derive(Clone)]
pub struct ResultMirror {
    results: ResultStore,
    client: reqwest::Client,
}

impl ResultMirror {
    pub fn new(results: ResultStore, client: reqwest::Client) -> Self {
        Self { results, client }
    }

    /// Copy every artifact of completed jobs that the store does not hold
    /// yet. Returns how many were copied.
    pub async fn sync(&self, base: &str) -> Result<usize, MirrorError> {
        let base = base.trim_end_matches('/');
        let jobs: Vec<Job> =
            self.get(&format!("{base}/api/jobs?limit={SCAN_LIMIT}")).await?.json().await?;

        let mut copied = 0;
        for job in jobs.iter().filter(|job| job.status == JobStatus::Complete) {
            let job_id = job.id.as_str();
            for name in &job.artifacts {
                if self.results.find(job_id, name).await?.is_some() {
                    continue;
                }
                if self.pull(base, job_id, name).await? {
                    copied += 1;
                }
            }
        }
        if copied > 0 {
            info!(copied, "mirrored results from pod");
        }
        Ok(copied)
    }

    /// Copy one artifact. `false` when the pod does not have it.
    pub async fn pull(&self, base: &str, job_id: &str, name: &str) -> Result<bool, MirrorError> {
        self.results.path_for(job_id, name)?;
        let url = format!("{}/api/results/{job_id}/{name}", base.trim_end_matches('/'));
        let resp = match self.get(&url).await {
            Err(MirrorError::Status { status: StatusCode::NOT_FOUND, .. }) => return Ok(false),
            other => other?,
        };

        let mut pending = self.results.receive(job_id, name).await?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            pending.write(&chunk?).await?;
        }
        let bytes = pending.commit().await?;
        debug!(job_id, name, bytes, "mirrored artifact");
        Ok(true)
    }

    /// One bounded pass against whichever pod the directory says is
    /// serving. Nothing happens without a `pod_url`; failures are logged.
    pub async fn sync_serving(&self, pods: &PodDirectory, limit: Duration) {
        let base = match pods.pod_url().await {
            Ok(Some(base)) => base,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "result mirror could not read directory");
                return;
            }
        };
        let outcome = match tokio::time::timeout(limit, self.sync(&base)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(MirrorError::TimedOut(limit)),
        };
        if let Err(e) = outcome {
            warn!(pod_url = %base, error = %e, "result mirror pass failed");
        }
    }

    /// Run [`sync_serving`](Self::sync_serving) every `interval` until
    /// `cancel` fires.
    pub fn spawn(
        self,
        pods: PodDirectory,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.sync_serving(&pods, PASS_LIMIT) => {}
                    },
                }
            }
            debug!("result mirror stopped");
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, MirrorError> {
        let resp = self.client.get(url).header(MIRROR_HEADER, "1").send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MirrorError::Status { url: url.to_string(), status });
        }
        Ok(resp)
    }
}
