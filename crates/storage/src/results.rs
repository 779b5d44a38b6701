// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable result store: artifacts copied off the pod so they can be served
//! after it is stopped.
//!
//! Layout is `<root>/<job_id>/<file>`. Names are validated before they touch
//! the filesystem, so route parameters cannot escape the root.

use mp_core::id::is_valid_id;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("invalid artifact path: {0}")]
    InvalidName(String),
    #[error("result store io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn job_dir(&self, job_id: &str) -> Result<PathBuf, ResultError> {
        if !is_valid_id(job_id) {
            return Err(ResultError::InvalidName(job_id.to_string()));
        }
        Ok(self.root.join(job_id))
    }

    /// Resolve the stored path for an artifact without checking it exists.
    pub fn path_for(&self, job_id: &str, name: &str) -> Result<PathBuf, ResultError> {
        if !is_valid_file_name(name) {
            return Err(ResultError::InvalidName(name.to_string()));
        }
        Ok(self.job_dir(job_id)?.join(name))
    }

    /// Copy `src` into the store as `<job_id>/<name>`.
    pub async fn publish(&self, job_id: &str, name: &str, src: &Path) -> Result<u64, ResultError> {
        let dest = self.path_for(job_id, name)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(src, &dest).await?;
        debug!(job_id, name, bytes, "published artifact");
        Ok(bytes)
    }

    /// Start receiving `<job_id>/<name>` in pieces. The artifact becomes
    /// visible to [`find`](Self::find) only once committed.
    pub async fn receive(&self, job_id: &str, name: &str) -> Result<PendingResult, ResultError> {
        let dest = self.path_for(job_id, name)?;
        let dir = self.job_dir(job_id)?;
        tokio::fs::create_dir_all(&dir).await?;
        let partial = dir.join(format!(".{name}.partial"));
        let file = tokio::fs::File::create(&partial).await?;
        Ok(PendingResult { file, partial, dest, committed: false })
    }

    /// Stored artifact path, or `None` if it was never published.
    pub async fn find(&self, job_id: &str, name: &str) -> Result<Option<PathBuf>, ResultError> {
        let path = self.path_for(job_id, name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every artifact of a job. Missing directories are fine.
    pub async fn remove(&self, job_id: &str) -> Result<(), ResultError> {
        let dir = self.job_dir(job_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// An artifact being written. Dropping it uncommitted discards the bytes.
#[derive(Debug)]
pub struct PendingResult {
    file: tokio::fs::File,
    partial: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl PendingResult {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), ResultError> {
        self.file.write_all(chunk).await?;
        Ok(())
    }

    /// Flush and move into place; returns the stored size.
    pub async fn commit(mut self) -> Result<u64, ResultError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        let bytes = self.file.metadata().await?.len();
        tokio::fs::rename(&self.partial, &self.dest).await?;
        self.committed = true;
        debug!(dest = %self.dest.display(), bytes, "received artifact");
        Ok(bytes)
    }
}

impl Drop for PendingResult {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.partial);
        }
    }
}

/// A single path component of safe characters, not starting with a dot.
fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
