// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only logger for per-job activity logs.

use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only logger for per-job activity logs.
///
/// Writes human-readable timestamped lines to `<log_dir>/<job_id>.log`.
///
/// Each `append()` call opens, writes, and closes the file.
/// This is safe for the low write frequency of stage events.
#[derive(Debug, Clone)]
pub struct JobLogger {
    log_dir: PathBuf,
}

fn now_utc() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl JobLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self { log_dir: log_dir.into() }
    }

    pub fn log_path(&self, job_id: &str) -> PathBuf {
        self.log_dir.join(format!("{job_id}.log"))
    }

    /// Append a log line for the given job.
    ///
    /// Format: `2026-01-30T08:14:09Z [stage] message`
    ///
    /// Failures are logged via tracing but do not propagate; logging
    /// must not fail a job.
    pub fn append(&self, job_id: &str, stage: &str, message: &str) {
        let path = self.log_path(job_id);
        if let Err(e) = write_line(&path, stage, message) {
            tracing::warn!(job_id, error = %e, "failed to write job log");
        }
    }

    /// Append a fenced block (e.g. a stderr tail) to the job log.
    ///
    /// Format:
    /// ```text
    /// {timestamp} [{stage}] ```{label}
    /// {content}
    /// {timestamp} [{stage}] ```
    /// ```
    pub fn append_fenced(&self, job_id: &str, stage: &str, label: &str, content: &str) {
        let path = self.log_path(job_id);
        if let Err(e) = write_fenced(&path, stage, label, content) {
            tracing::warn!(job_id, error = %e, "failed to write job log");
        }
    }

    /// Remove a job's log. Missing logs are fine.
    pub fn remove(&self, job_id: &str) {
        let path = self.log_path(job_id);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(job_id, error = %e, "failed to remove job log");
            }
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn write_line(path: &Path, stage: &str, message: &str) -> std::io::Result<()> {
    let mut file = open_append(path)?;
    writeln!(file, "{} [{}] {}", now_utc(), stage, message)
}

fn write_fenced(path: &Path, stage: &str, label: &str, content: &str) -> std::io::Result<()> {
    let mut file = open_append(path)?;
    writeln!(file, "{} [{}] ```{}", now_utc(), stage, label)?;
    write!(file, "{}", content)?;
    if !content.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{} [{}] ```", now_utc(), stage)
}

#[cfg(test)]
#[path = "job_logger_tests.rs"]
mod tests;
