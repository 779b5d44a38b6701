// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed multi-stage media pipeline.
//!
//! Each stage is a list of shell steps with declared outputs. Fatal stages
//! fail the job on the first broken step; cosmetic stages record warnings
//! and let the job complete. A zero exit code is never trusted on its own:
//! declared outputs are checked on disk.

mod executor;
mod gate;
mod runner;
mod stages;

pub use executor::PipelineExecutor;
pub use gate::DependencyGate;
pub use runner::JobRunner;

use mp_adapters::SubprocessError;
use mp_core::Stage;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// File the build stage must leave behind for the job to succeed.
pub const PRIMARY_ARTIFACT: &str = "result.glb";

/// Artifacts copied to the durable result store when present.
pub const PUBLISHED_ARTIFACTS: [&str; 4] =
    ["result.glb", "overlay.mp4", "comparison.mp4", "preview.png"];

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Subprocess(SubprocessError),
    #[error("`{label}` failed (exit {code}): {stderr}")]
    Exit { label: String, code: i32, stderr: String },
    #[error("`{label}` exited 0 but did not produce {output}")]
    MissingArtifact { label: String, output: String },
    #[error("cancelled")]
    Cancelled,
    #[error("failed to prepare work dir: {0}")]
    WorkDir(#[from] std::io::Error),
}

impl From<SubprocessError> for StageError {
    fn from(e: SubprocessError) -> Self {
        match e {
            SubprocessError::Cancelled { .. } => StageError::Cancelled,
            other => StageError::Subprocess(other),
        }
    }
}

/// One shell command within a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    pub label: String,
    /// Template with `${source}`, `${workdir}`, `${job_id}`, `${tools}` and
    /// `${preprocessor}` placeholders, substituted shell-quoted.
    pub command: String,
    /// Paths relative to the work dir that must exist after a zero exit.
    pub outputs: Vec<String>,
}

impl StepSpec {
    pub fn new(label: &str, command: impl Into<String>, outputs: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            command: command.into(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub stage: Stage,
    pub steps: Vec<StepSpec>,
    /// Wall-clock limit applied to each step.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// In execution order.
    pub stages: Vec<StageSpec>,
    pub tools_dir: PathBuf,
    /// Base URL of the optional preprocessing service.
    pub preprocessor_url: Option<String>,
}

impl PipelineConfig {
    /// The built-in tool chain. The preprocessing service step is only
    /// included when a service URL is configured.
    pub fn new(tools_dir: impl Into<PathBuf>, preprocessor_url: Option<String>) -> Self {
        let stages = stages::default_stages(preprocessor_url.is_some());
        Self { stages, tools_dir: tools_dir.into(), preprocessor_url }
    }

    /// Pipeline from explicit stages, for tests and custom deployments.
    pub fn with_stages(stages: Vec<StageSpec>, tools_dir: impl Into<PathBuf>) -> Self {
        Self { stages, tools_dir: tools_dir.into(), preprocessor_url: None }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Replace a stage's steps with a single command that must produce
    /// every output the built-in steps declared.
    pub fn override_stage(&mut self, stage: Stage, command: &str) {
        let Some(spec) = self.stages.iter_mut().find(|s| s.stage == stage) else {
            return;
        };
        let mut outputs: Vec<String> = Vec::new();
        for output in spec.steps.iter().flat_map(|s| s.outputs.iter()) {
            if !outputs.contains(output) {
                outputs.push(output.clone());
            }
        }
        spec.steps = vec![StepSpec {
            label: stage.as_str().to_string(),
            command: command.to_string(),
            outputs,
        }];
    }
}

#[cfg(test)]
#[path = "../pipeline_tests.rs"]
mod tests;
