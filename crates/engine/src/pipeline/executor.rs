// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs one job through every stage, reporting progress to the job store.

use super::{PipelineConfig, StageError, StageSpec, StepSpec, PRIMARY_ARTIFACT, PUBLISHED_ARTIFACTS};
use crate::jobs::{JobError, JobService};
use crate::vars::interpolate_shell;
use mp_adapters::run_with_timeout;
use mp_core::{Clock, Job, JobId, JobPatch, JobStatus, Stage};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Lines of stderr kept in error messages and the job log.
const STDERR_TAIL_LINES: usize = 20;

pub struct PipelineExecutor<C: Clock> {
    jobs: JobService<C>,
    config: Arc<PipelineConfig>,
}

impl<C: Clock> Clone for PipelineExecutor<C> {
    fn clone(&self) -> Self {
        Self { jobs: self.jobs.clone(), config: Arc::clone(&self.config) }
    }
}

/// What stopped the stage loop early.
enum Halt {
    /// The job was deleted: stop without touching the record.
    Deleted,
    /// The job reached a terminal state.
    Finished,
}

impl<C: Clock> PipelineExecutor<C> {
    pub fn new(jobs: JobService<C>, config: PipelineConfig) -> Self {
        Self { jobs, config: Arc::new(config) }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute every stage for `job_id`. Returns the final record, or
    /// `None` if the job was deleted while running.
    pub async fn run(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> Result<Option<Job>, JobError> {
        let Some(job) = self.jobs.get(job_id) else {
            return Ok(None);
        };
        if job.is_terminal() {
            return Ok(Some(job));
        }

        let work_dir = self.jobs.work_dir(job_id);
        if let Err(e) = tokio::fs::create_dir_all(&work_dir).await {
            error!(job_id = %job_id, error = %e, "failed to create work dir");
            return self.patch(job_id, JobPatch::failed(StageError::WorkDir(e).to_string()));
        }

        let vars = self.vars(&job, &work_dir);
        info!(job_id = %job_id, work_dir = %work_dir.display(), "pipeline started");

        for spec in &self.config.stages {
            match self.run_stage(&job, spec, &vars, &work_dir, cancel).await {
                Ok(()) => {}
                Err(Halt::Deleted) => return Ok(None),
                Err(Halt::Finished) => return Ok(self.jobs.get(job_id)),
            }
        }

        let artifacts = self.publish(job_id, &work_dir).await;
        info!(job_id = %job_id, artifacts = artifacts.len(), "pipeline complete");
        self.log(job_id, "complete", &format!("published {}", artifacts.join(", ")));
        self.patch(job_id, JobPatch::complete(artifacts))
    }

    async fn run_stage(
        &self,
        job: &Job,
        spec: &StageSpec,
        vars: &HashMap<&str, String>,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), Halt> {
        let job_id = &job.id;
        let stage = spec.stage;
        if cancel.is_cancelled() {
            return Err(Halt::Deleted);
        }
        self.step_patch(job_id, JobPatch::enter(stage))?;
        self.log(job_id, stage.as_str(), "started");

        let (lo, hi) = stage.progress_band();
        let total = spec.steps.len().max(1);
        for (i, step) in spec.steps.iter().enumerate() {
            let result = self.run_step(job_id, stage, step, spec, vars, work_dir, cancel).await;
            match result {
                Ok(()) => {}
                Err(StageError::Cancelled) => {
                    info!(job_id = %job_id, %stage, "job cancelled mid-stage");
                    return Err(Halt::Deleted);
                }
                Err(e) if stage.is_fatal() => {
                    error!(job_id = %job_id, %stage, error = %e, "fatal stage failed");
                    self.log(job_id, stage.as_str(), &format!("failed: {e}"));
                    self.step_patch(job_id, JobPatch::failed(format!("{stage}: {e}")))?;
                    return Err(Halt::Finished);
                }
                Err(e) => {
                    warn!(job_id = %job_id, %stage, error = %e, "cosmetic step failed");
                    self.log(job_id, stage.as_str(), &format!("warning: {e}"));
                    self.step_patch(job_id, JobPatch::warning(format!("{stage}: {e}")))?;
                }
            }
            self.step_patch(job_id, JobPatch::progress(interpolate(lo, hi, i + 1, total)))?;
        }

        if stage == Stage::Build && !is_present(&work_dir.join(PRIMARY_ARTIFACT)).await {
            let e = StageError::MissingArtifact {
                label: stage.as_str().to_string(),
                output: PRIMARY_ARTIFACT.to_string(),
            };
            error!(job_id = %job_id, error = %e, "primary artifact missing");
            self.log(job_id, stage.as_str(), &format!("failed: {e}"));
            self.step_patch(job_id, JobPatch::failed(format!("{stage}: {e}")))?;
            return Err(Halt::Finished);
        }

        self.log(job_id, stage.as_str(), "finished");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_step(
        &self,
        job_id: &JobId,
        stage: Stage,
        step: &StepSpec,
        spec: &StageSpec,
        vars: &HashMap<&str, String>,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        let command = interpolate_shell(&step.command, vars);
        info!(job_id = %job_id, %stage, step = %step.label, %command, "running step");
        self.log(job_id, stage.as_str(), &format!("$ {command}"));

        let wrapped = format!("set -euo pipefail\n{command}");
        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg("-c").arg(&wrapped).current_dir(work_dir);
        let output = run_with_timeout(cmd, spec.timeout, cancel, &step.label).await?;

        if !output.status.success() {
            let stderr = tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_LINES);
            if !stderr.is_empty() {
                self.jobs.config().logger.append_fenced(
                    job_id.as_str(),
                    stage.as_str(),
                    "stderr",
                    &stderr,
                );
            }
            return Err(StageError::Exit {
                label: step.label.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        for out in &step.outputs {
            if !is_present(&work_dir.join(out)).await {
                return Err(StageError::MissingArtifact {
                    label: step.label.clone(),
                    output: out.clone(),
                });
            }
        }
        Ok(())
    }

    /// Copy produced artifacts to the result store. Failures drop the
    /// artifact from the list rather than failing a finished job.
    async fn publish(&self, job_id: &JobId, work_dir: &Path) -> Vec<String> {
        let results = &self.jobs.config().results;
        let mut published = Vec::new();
        for name in PUBLISHED_ARTIFACTS {
            let src = work_dir.join(name);
            if !is_present(&src).await {
                continue;
            }
            match results.publish(job_id.as_str(), name, &src).await {
                Ok(bytes) => {
                    info!(job_id = %job_id, name, bytes, "artifact published");
                    published.push(name.to_string());
                }
                Err(e) => warn!(job_id = %job_id, name, error = %e, "failed to publish artifact"),
            }
        }
        published
    }

    fn vars(&self, job: &Job, work_dir: &Path) -> HashMap<&'static str, String> {
        HashMap::from([
            ("source", job.source_ref.clone()),
            ("workdir", work_dir.display().to_string()),
            ("job_id", job.id.to_string()),
            ("tools", self.config.tools_dir.display().to_string()),
            ("preprocessor", self.config.preprocessor_url.clone().unwrap_or_default()),
        ])
    }

    fn patch(&self, job_id: &JobId, patch: JobPatch) -> Result<Option<Job>, JobError> {
        match self.jobs.update(job_id, patch) {
            Ok(job) => Ok(Some(job)),
            Err(JobError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Patch during the stage loop. A vanished job halts the loop; a
    /// persistence failure is logged, the record keeps its last saved state
    /// and the run continues, so the next patch that saves catches it up.
    fn step_patch(&self, job_id: &JobId, patch: JobPatch) -> Result<(), Halt> {
        match self.jobs.update(job_id, patch) {
            Ok(job) if job.is_terminal() && job.status != JobStatus::Complete => {
                Err(Halt::Finished)
            }
            Ok(_) => Ok(()),
            Err(JobError::NotFound(_)) => Err(Halt::Deleted),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "failed to persist job update");
                Ok(())
            }
        }
    }

    fn log(&self, job_id: &JobId, stage: &str, message: &str) {
        self.jobs.config().logger.append(job_id.as_str(), stage, message);
    }
}

fn interpolate(lo: u8, hi: u8, done: usize, total: usize) -> u8 {
    let span = usize::from(hi.saturating_sub(lo));
    let step = span * done.min(total) / total.max(1);
    lo.saturating_add(u8::try_from(step).unwrap_or(u8::MAX))
}

async fn is_present(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

fn tail(s: &str, lines: usize) -> String {
    let all: Vec<&str> = s.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
