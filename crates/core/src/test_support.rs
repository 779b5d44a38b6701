// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{DesiredStatus, Job, JobId, JobStatus, PodRecord};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for the job state machine.
pub mod strategies {
    use crate::job::{JobPatch, JobStatus, Stage};
    use proptest::prelude::*;

    pub fn arb_stage() -> impl Strategy<Value = Stage> {
        prop::sample::select(Stage::ALL.to_vec())
    }

    pub fn arb_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            8 => arb_stage().prop_map(Stage::status),
            1 => Just(JobStatus::Complete),
            1 => Just(JobStatus::Failed),
        ]
    }

    /// Patches the way the executor emits them, plus arbitrary progress values.
    pub fn arb_patch() -> impl Strategy<Value = JobPatch> {
        prop_oneof![
            4 => any::<u8>().prop_map(JobPatch::progress),
            3 => arb_stage().prop_map(JobPatch::enter),
            1 => "[a-z ]{1,16}".prop_map(JobPatch::warning),
            1 => Just(JobPatch::complete(vec!["result.glb".to_string()])),
            1 => "[a-z ]{1,16}".prop_map(JobPatch::failed),
        ]
    }
}

// ── Record factories ────────────────────────────────────────────────────

/// A job parked in `status` with the given progress.
pub fn job_in(id: &str, status: JobStatus, progress: u8) -> Job {
    Job::builder(id).status(status).progress(progress).build()
}

pub fn new_job(id: &str, created_at_ms: u64) -> Job {
    Job::new(JobId::from_string(id), "/videos/input.mp4", created_at_ms)
}

/// A pod record as the provider reports it.
pub fn pod_record(id: &str, desired_status: DesiredStatus) -> PodRecord {
    PodRecord {
        id: id.to_string(),
        desired_status,
        uptime_secs: 0,
        gpu: Some("NVIDIA GeForce RTX 4090".to_string()),
        endpoint: None,
    }
}
