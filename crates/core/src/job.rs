// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier, pipeline stages and the job record state machine.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a submitted job.
    ///
    /// Short enough to show in a URL and to name the job's working
    /// directory and artifact folder.
    pub struct JobId(10);
}

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Normalise the source media (frame rate, container, silhouette pass)
    Preprocess,
    /// Extract pose/motion data with the inference tool
    Extract,
    /// Convert raw extraction output into an animation file
    Convert,
    /// Build the final animated artifact with the 3D content tool
    Build,
    /// Render a preview/overlay of the result
    Render,
    /// Composite comparison media from intermediate artifacts
    Composite,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Preprocess,
        Stage::Extract,
        Stage::Convert,
        Stage::Build,
        Stage::Render,
        Stage::Composite,
    ];

    /// The first stage every new job is parked at.
    pub const FIRST: Stage = Stage::Preprocess;

    /// Fatal stages abort the job on failure; cosmetic ones are logged and skipped.
    pub fn is_fatal(self) -> bool {
        matches!(self, Stage::Preprocess | Stage::Extract | Stage::Convert | Stage::Build)
    }

    /// Progress percentage at the start and end of this stage.
    pub fn progress_band(self) -> (u8, u8) {
        match self {
            Stage::Preprocess => (0, 10),
            Stage::Extract => (10, 55),
            Stage::Convert => (55, 65),
            Stage::Build => (65, 85),
            Stage::Render => (85, 95),
            Stage::Composite => (95, 99),
        }
    }

    /// Job status while this stage runs.
    pub fn status(self) -> JobStatus {
        match self {
            Stage::Preprocess => JobStatus::Preprocessing,
            Stage::Extract => JobStatus::Extracting,
            Stage::Convert => JobStatus::Converting,
            Stage::Build => JobStatus::Building,
            Stage::Render => JobStatus::Rendering,
            Stage::Composite => JobStatus::Compositing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Extract => "extract",
            Stage::Convert => "convert",
            Stage::Build => "build",
            Stage::Render => "render",
            Stage::Composite => "composite",
        }
    }
}

crate::simple_display! {
    Stage {
        Preprocess => "preprocess",
        Extract => "extract",
        Convert => "convert",
        Build => "build",
        Render => "render",
        Composite => "composite",
    }
}

/// Job status: one value per pipeline stage plus the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Preprocessing,
    Extracting,
    Converting,
    Building,
    Rendering,
    Compositing,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    /// The stage this status belongs to, if non-terminal.
    pub fn stage(self) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.status() == self)
    }
}

crate::simple_display! {
    JobStatus {
        Preprocessing => "preprocessing",
        Extracting => "extracting",
        Converting => "converting",
        Building => "building",
        Rendering => "rendering",
        Compositing => "compositing",
        Complete => "complete",
        Failed => "failed",
    }
}

/// A submitted job as persisted and broadcast to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    /// Where the source video comes from (path or URL), opaque to the pipeline.
    pub source_ref: String,
    pub status: JobStatus,
    /// Integer percent, never decreasing while the job is non-terminal.
    pub progress: u8,
    /// Set only when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Cosmetic-stage failures that did not fail the job.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Artifact file names published to the durable result store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    /// Epoch milliseconds
    pub created_at: u64,
    /// Epoch milliseconds
    pub updated_at: u64,
}

impl Job {
    /// A freshly submitted job: first stage, zero progress.
    pub fn new(id: JobId, source_ref: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id,
            source_ref: source_ref.into(),
            status: Stage::FIRST.status(),
            progress: 0,
            error: None,
            warnings: Vec::new(),
            artifacts: Vec::new(),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Merge a patch into the record and stamp `updated_at`.
    ///
    /// Terminal jobs are frozen: the patch is dropped and `false` returned.
    /// Progress only moves forward while the job is non-terminal, and an
    /// error message is only kept when the patch fails the job.
    pub fn apply(&mut self, patch: JobPatch, now_ms: u64) -> bool {
        if self.is_terminal() {
            return false;
        }

        if let Some(progress) = patch.progress {
            self.progress = self.progress.max(progress.min(100));
        }
        if let Some(warning) = patch.warning {
            self.warnings.push(warning);
        }
        if let Some(artifacts) = patch.artifacts {
            self.artifacts = artifacts;
        }
        if let Some(status) = patch.status {
            self.status = status;
            match status {
                JobStatus::Complete => self.progress = 100,
                JobStatus::Failed => {
                    self.error = Some(patch.error.unwrap_or_else(|| "job failed".to_string()));
                }
                _ => {}
            }
        }

        self.updated_at = now_ms.max(self.updated_at);
        true
    }
}

/// Partial update to a [`Job`], applied with [`Job::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub error: Option<String>,
    pub warning: Option<String>,
    pub artifacts: Option<Vec<String>>,
}

impl JobPatch {
    /// Enter a stage: status plus the stage's starting progress.
    pub fn enter(stage: Stage) -> Self {
        Self {
            status: Some(stage.status()),
            progress: Some(stage.progress_band().0),
            ..Self::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self { progress: Some(progress), ..Self::default() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { warning: Some(message.into()), ..Self::default() }
    }

    pub fn complete(artifacts: Vec<String>) -> Self {
        Self {
            status: Some(JobStatus::Complete),
            progress: Some(100),
            artifacts: Some(artifacts),
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { status: Some(JobStatus::Failed), error: Some(message.into()), ..Self::default() }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use builder::JobBuilder;

#[cfg(any(test, feature = "test-support"))]
mod builder {
    use super::{Job, JobId, JobStatus};

    /// Test builder for [`Job`] records in arbitrary states.
    pub struct JobBuilder {
        job: Job,
    }

    impl JobBuilder {
        pub fn new(id: &str) -> Self {
            Self { job: Job::new(JobId::from_string(id), "/videos/input.mp4", 1_000_000) }
        }

        pub fn source(mut self, source_ref: &str) -> Self {
            self.job.source_ref = source_ref.to_string();
            self
        }

        pub fn status(mut self, status: JobStatus) -> Self {
            self.job.status = status;
            self
        }

        pub fn progress(mut self, progress: u8) -> Self {
            self.job.progress = progress;
            self
        }

        pub fn created_at(mut self, ms: u64) -> Self {
            self.job.created_at = ms;
            self.job.updated_at = ms;
            self
        }

        pub fn error(mut self, message: &str) -> Self {
            self.job.status = JobStatus::Failed;
            self.job.error = Some(message.to_string());
            self
        }

        pub fn build(self) -> Job {
            self.job
        }
    }

    impl Job {
        /// Create a builder with test defaults.
        pub fn builder(id: &str) -> JobBuilder {
            JobBuilder::new(id)
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
