// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-engine: pod lifecycle coordination, idle reaping, and the job
//! pipeline (store, queue, executor, broadcaster)

pub mod broadcast;
pub mod coordinator;
pub mod job_logger;
pub mod jobs;
pub mod pipeline;
pub mod queue;
pub mod reaper;
pub mod vars;

pub use broadcast::EventBroadcaster;
pub use coordinator::{CoordinatorConfig, LifecycleError, PodCoordinator};
pub use job_logger::JobLogger;
pub use jobs::{JobError, JobService, JobServiceConfig};
pub use pipeline::{
    DependencyGate, JobRunner, PipelineConfig, PipelineExecutor, StageError, StageSpec, StepSpec,
};
pub use queue::{JobQueue, QueueStats, Slot};
pub use reaper::{IdleReaper, ReapOutcome};
