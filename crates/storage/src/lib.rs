// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-storage: the shared pod directory, the job snapshot and the durable
//! result store

mod directory;
mod jobs;
mod pod_entry;
mod results;
mod snapshot;

pub use directory::{Directory, DirectoryError, FileDirectory, MemoryDirectory};
pub use jobs::{JobRepository, JobSnapshot, CURRENT_SNAPSHOT_VERSION};
pub use pod_entry::{keys, PodDirectory, PodEntry};
pub use results::{PendingResult, ResultError, ResultStore};
pub use snapshot::SnapshotError;
