// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store: the in-memory job set, persisted on every change and
//! broadcast to observers.

use crate::broadcast::EventBroadcaster;
use crate::job_logger::JobLogger;
use mp_core::{Clock, Job, JobEvent, JobId, JobPatch};
use mp_storage::{JobRepository, ResultError, ResultStore, SnapshotError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Error recorded on jobs found unfinished at startup.
pub const INTERRUPTED_ERROR: &str = "interrupted: worker restarted before the job finished";

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("sourceRef must not be empty")]
    EmptySource,
    #[error("failed to persist jobs: {0}")]
    Persist(#[from] SnapshotError),
    #[error("failed to remove artifacts: {0}")]
    Artifacts(#[from] ResultError),
}

/// Where a job's files live besides the record itself.
#[derive(Debug, Clone)]
pub struct JobServiceConfig {
    /// Per-job working directories: `<work_root>/<job_id>`
    pub work_root: PathBuf,
    pub results: ResultStore,
    pub logger: JobLogger,
}

struct JobsState {
    jobs: HashMap<JobId, Job>,
    /// Cancels a job's queue wait, dependency wait and running subprocess
    cancels: HashMap<JobId, CancellationToken>,
}

pub struct JobService<C: Clock> {
    state: Arc<Mutex<JobsState>>,
    repo: JobRepository,
    events: EventBroadcaster,
    config: JobServiceConfig,
    clock: C,
}

impl<C: Clock> Clone for JobService<C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            repo: self.repo.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<C: Clock> JobService<C> {
    /// Load persisted jobs and fail any that were mid-pipeline when the
    /// previous process exited. Queue position is not persisted, so those
    /// jobs cannot be resumed.
    pub fn open(
        repo: JobRepository,
        events: EventBroadcaster,
        config: JobServiceConfig,
        clock: C,
    ) -> Result<Self, JobError> {
        let now = clock.epoch_ms();
        let mut jobs = HashMap::new();
        let mut interrupted = 0usize;
        for mut job in repo.load()? {
            if job.apply(JobPatch::failed(INTERRUPTED_ERROR), now) {
                warn!(job_id = %job.id, "marking interrupted job failed");
                interrupted += 1;
            }
            jobs.insert(job.id.clone(), job);
        }
        if interrupted > 0 {
            repo.save(jobs.values())?;
        }
        info!(jobs = jobs.len(), interrupted, "job store opened");

        Ok(Self {
            state: Arc::new(Mutex::new(JobsState { jobs, cancels: HashMap::new() })),
            repo,
            events,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &JobServiceConfig {
        &self.config
    }

    pub fn work_dir(&self, id: &JobId) -> PathBuf {
        self.config.work_root.join(id.as_str())
    }

    /// Register a new job at the first stage and persist it before returning.
    pub fn create(&self, source_ref: &str) -> Result<(Job, CancellationToken), JobError> {
        let source_ref = source_ref.trim();
        if source_ref.is_empty() {
            return Err(JobError::EmptySource);
        }

        let job = Job::new(JobId::new(), source_ref, self.clock.epoch_ms());
        let cancel = CancellationToken::new();
        {
            let mut state = self.state.lock();
            state.jobs.insert(job.id.clone(), job.clone());
            if let Err(e) = self.repo.save(state.jobs.values()) {
                state.jobs.remove(&job.id);
                return Err(e.into());
            }
            state.cancels.insert(job.id.clone(), cancel.clone());
            self.events.send(JobEvent::Created { job: job.clone() });
        }
        info!(job_id = %job.id, source_ref, "job created");
        Ok((job, cancel))
    }

    /// Merge a patch, persist, and notify observers.
    ///
    /// Patches to terminal jobs are dropped and the unchanged record returned.
    pub fn update(&self, id: &JobId, patch: JobPatch) -> Result<Job, JobError> {
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();
        let job = state.jobs.get_mut(id).ok_or_else(|| JobError::NotFound(id.clone()))?;
        let before = job.clone();
        if !job.apply(patch, now) {
            return Ok(job.clone());
        }
        let job = job.clone();
        // Memory never runs ahead of disk.
        if let Err(e) = self.repo.save(state.jobs.values()) {
            state.jobs.insert(id.clone(), before);
            return Err(e.into());
        }
        if job.is_terminal() {
            state.cancels.remove(id);
        }
        self.events.send(JobEvent::Updated { job: job.clone() });
        Ok(job)
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.state.lock().jobs.get(id).cloned()
    }

    /// Most recent first, capped at [`MAX_LIST_LIMIT`].
    pub fn list(&self, limit: Option<usize>) -> Vec<Job> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let mut jobs = self.snapshot();
        jobs.truncate(limit);
        jobs
    }

    /// Every job, most recent first.
    pub fn snapshot(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.state.lock().jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Current snapshot plus a receiver for every later change.
    ///
    /// Both are taken under the store lock, so no event falls between them.
    pub fn subscribe(&self) -> (Vec<Job>, broadcast::Receiver<JobEvent>) {
        let state = self.state.lock();
        let rx = self.events.subscribe();
        let mut jobs: Vec<Job> = state.jobs.values().cloned().collect();
        drop(state);
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        (jobs, rx)
    }

    /// Cancellation token for a job that has not finished yet.
    pub fn cancel_token(&self, id: &JobId) -> Option<CancellationToken> {
        self.state.lock().cancels.get(id).cloned()
    }

    /// Remove a job: stop its execution, delete the record, its working
    /// directory, log and published artifacts, then notify observers.
    pub async fn delete(&self, id: &JobId) -> Result<Job, JobError> {
        let job = {
            let mut state = self.state.lock();
            if !state.jobs.contains_key(id) {
                return Err(JobError::NotFound(id.clone()));
            }
            self.repo.save(state.jobs.values().filter(|job| job.id != *id))?;
            let job = state.jobs.remove(id).ok_or_else(|| JobError::NotFound(id.clone()))?;
            if let Some(cancel) = state.cancels.remove(id) {
                cancel.cancel();
            }
            self.events.send(JobEvent::Deleted { id: id.clone() });
            job
        };

        let work_dir = self.work_dir(id);
        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(job_id = %id, error = %e, "failed to remove work dir");
            }
        }
        self.config.logger.remove(id.as_str());
        self.config.results.remove(id.as_str()).await?;
        info!(job_id = %id, "job deleted");
        Ok(job)
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
