// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission path: create the job, then queue, gate and execute it in the
//! background.

use super::{DependencyGate, PipelineConfig, PipelineExecutor};
use crate::jobs::{JobError, JobService};
use crate::queue::JobQueue;
use mp_core::{Clock, Job, JobId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct JobRunner<C: Clock> {
    jobs: JobService<C>,
    queue: JobQueue,
    gate: DependencyGate,
    executor: PipelineExecutor<C>,
}

impl<C: Clock> Clone for JobRunner<C> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
            queue: self.queue.clone(),
            gate: self.gate.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<C: Clock> JobRunner<C> {
    pub fn new(
        jobs: JobService<C>,
        queue: JobQueue,
        gate: DependencyGate,
        config: PipelineConfig,
    ) -> Self {
        let executor = PipelineExecutor::new(jobs.clone(), config);
        Self { jobs, queue, gate, executor }
    }

    pub fn jobs(&self) -> &JobService<C> {
        &self.jobs
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Persist a new job and schedule it. Returns once the record exists.
    pub fn submit(&self, source_ref: &str) -> Result<Job, JobError> {
        let (job, cancel) = self.jobs.create(source_ref)?;
        self.spawn(job.id.clone(), cancel);
        Ok(job)
    }

    fn spawn(&self, job_id: JobId, cancel: CancellationToken) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.drive(job_id, cancel).await })
    }

    async fn drive(self, job_id: JobId, cancel: CancellationToken) {
        let slot = tokio::select! {
            slot = self.queue.acquire() => slot,
            _ = cancel.cancelled() => {
                info!(job_id = %job_id, "job deleted while queued");
                return;
            }
        };
        let Some(_slot) = slot else {
            warn!(job_id = %job_id, "queue closed before job could start");
            return;
        };

        if !self.gate.wait(&cancel).await {
            info!(job_id = %job_id, "job deleted while waiting for dependency");
            return;
        }

        match self.executor.run(&job_id, &cancel).await {
            Ok(Some(job)) => info!(job_id = %job_id, status = %job.status, "job finished"),
            Ok(None) => info!(job_id = %job_id, "job deleted during execution"),
            Err(e) => error!(job_id = %job_id, error = %e, "job execution failed"),
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
