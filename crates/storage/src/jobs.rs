// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record persistence.
//!
//! The whole job set is written as one versioned JSON snapshot. Writes go to
//! a temp file and are renamed into place, so a crash leaves either the old
//! or the new snapshot. A snapshot that fails to parse is moved aside to a
//! rotating `.bak` and loading falls back to an empty set.

use crate::snapshot::{rotate_bak_path, write_atomic, SnapshotError};
use chrono::{DateTime, Utc};
use mp_core::Job;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// All job records at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Schema version for migrations
    #[serde(rename = "v")]
    pub version: u32,
    pub jobs: Vec<Job>,
    /// When this snapshot was written
    pub saved_at: DateTime<Utc>,
}

/// Reads and writes `jobs.json`.
#[derive(Debug, Clone)]
pub struct JobRepository {
    path: PathBuf,
}

impl JobRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted jobs. A missing file is an empty set.
    pub fn load(&self) -> Result<Vec<Job>, SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let snapshot: JobSnapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let bak = rotate_bak_path(&self.path);
                warn!(
                    path = %self.path.display(),
                    backup = %bak.display(),
                    error = %e,
                    "corrupt job snapshot, moving aside"
                );
                fs::rename(&self.path, &bak)?;
                return Ok(Vec::new());
            }
        };

        if snapshot.version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
                supported: CURRENT_SNAPSHOT_VERSION,
            });
        }

        info!(jobs = snapshot.jobs.len(), saved_at = %snapshot.saved_at, "loaded job snapshot");
        Ok(snapshot.jobs)
    }

    /// Replace the persisted job set.
    pub fn save<'a>(&self, jobs: impl IntoIterator<Item = &'a Job>) -> Result<(), SnapshotError> {
        let snapshot = JobSnapshot {
            version: CURRENT_SNAPSHOT_VERSION,
            jobs: jobs.into_iter().cloned().collect(),
            saved_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
