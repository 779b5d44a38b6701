// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job events pushed to connected observers.

use crate::job::{Job, JobId};
use serde::{Deserialize, Serialize};

/// A change notice for observers of the job list.
///
/// Serialized with an internal `type` tag so clients can switch on it:
/// `{"type": "updated", "job": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// Every known job, sent first on connect and after an observer lags.
    Snapshot { jobs: Vec<Job> },
    Created { job: Job },
    Updated { job: Job },
    Deleted { id: JobId },
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Snapshot { .. } => "snapshot",
            JobEvent::Created { .. } => "created",
            JobEvent::Updated { .. } => "updated",
            JobEvent::Deleted { .. } => "deleted",
        }
    }

    /// The job this event concerns, if it concerns a single job.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            JobEvent::Snapshot { .. } => None,
            JobEvent::Created { job } | JobEvent::Updated { job } => Some(&job.id),
            JobEvent::Deleted { id } => Some(id),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
