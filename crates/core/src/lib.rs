// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-core: domain types shared by the motionpod gateway and worker

pub mod macros;

pub mod clock;
pub mod event;
pub mod id;
pub mod job;
pub mod pod;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::JobEvent;
pub use id::short;
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{Job, JobId, JobPatch, JobStatus, Stage};
pub use pod::{DesiredStatus, GpuPriorityList, PodPhase, PodRecord, PodReport, StartStrategy};
