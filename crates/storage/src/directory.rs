// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value directory shared by every pod lifecycle handler.
//!
//! No transactions, no conditional writes: each key is last-write-wins.

use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors from directory reads and writes
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("directory task failed: {0}")]
    Task(String),
}

/// Named string keys with get/put/delete.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, DirectoryError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), DirectoryError>;
    async fn delete(&self, key: &str) -> Result<(), DirectoryError>;
}

/// In-process directory. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every key currently set.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn get(&self, key: &str) -> Result<Option<String>, DirectoryError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), DirectoryError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DirectoryError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Directory persisted as a flat JSON object on disk.
///
/// Every operation takes an exclusive advisory lock on `<path>.lock`, so
/// separate processes sharing the file see whole writes, never a torn file.
#[derive(Debug, Clone)]
pub struct FileDirectory {
    path: PathBuf,
}

impl FileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_locked<T, F>(&self, op: F) -> Result<T, DirectoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, DirectoryError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _lock = lock(&path)?;
            op(&path)
        })
        .await
        .map_err(|e| DirectoryError::Task(e.to_string()))?
    }
}

fn lock(path: &Path) -> Result<File, DirectoryError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path.with_extension("lock"))?;
    lock_file.lock_exclusive()?;
    Ok(lock_file)
}

fn read_map(path: &Path) -> Result<BTreeMap<String, String>, DirectoryError> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_map(path: &Path, map: &BTreeMap<String, String>) -> Result<(), DirectoryError> {
    let bytes = serde_json::to_vec_pretty(map)?;
    crate::snapshot::write_atomic(path, &bytes)?;
    Ok(())
}

#[async_trait]
impl Directory for FileDirectory {
    async fn get(&self, key: &str) -> Result<Option<String>, DirectoryError> {
        let key = key.to_string();
        self.with_locked(move |path| Ok(read_map(path)?.remove(&key))).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), DirectoryError> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_locked(move |path| {
            let mut map = read_map(path)?;
            map.insert(key, value);
            write_map(path, &map)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), DirectoryError> {
        let key = key.to_string();
        self.with_locked(move |path| {
            let mut map = read_map(path)?;
            if map.remove(&key).is_some() {
                write_map(path, &map)?;
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
