// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed view of the pod keys held in the [`Directory`].
//!
//! Write order keeps the invariant visible to concurrent readers: `pod_id`
//! is written before any runtime key, and runtime keys are deleted before
//! `pod_id`.

use crate::directory::{Directory, DirectoryError};
use mp_core::StartStrategy;
use std::sync::Arc;
use tracing::warn;

/// Directory key names.
pub mod keys {
    pub const POD_ID: &str = "pod_id";
    pub const POD_URL: &str = "pod_url";
    pub const LAST_ACTIVITY: &str = "lastActivity";
    pub const START_TIME: &str = "start_time";
    pub const START_STRATEGY: &str = "start_strategy";

    /// Keys that only mean something while `pod_id` is set.
    pub const RUNTIME: [&str; 4] = [POD_URL, LAST_ACTIVITY, START_TIME, START_STRATEGY];
}

/// Every pod key, read in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodEntry {
    pub pod_id: Option<String>,
    pub pod_url: Option<String>,
    /// Epoch milliseconds
    pub last_activity: Option<u64>,
    /// Epoch milliseconds
    pub start_time: Option<u64>,
    pub start_strategy: Option<StartStrategy>,
}

impl PodEntry {
    /// A pod id with no runtime keys: the pod was stopped (or a stop was
    /// requested) and is kept only for a later resume.
    pub fn is_parked(&self) -> bool {
        self.pod_id.is_some()
            && self.pod_url.is_none()
            && self.last_activity.is_none()
            && self.start_time.is_none()
            && self.start_strategy.is_none()
    }
}

/// Pod lifecycle operations over a shared [`Directory`].
#[derive(Clone)]
pub struct PodDirectory {
    inner: Arc<dyn Directory>,
}

impl PodDirectory {
    pub fn new(inner: Arc<dyn Directory>) -> Self {
        Self { inner }
    }

    pub async fn pod_id(&self) -> Result<Option<String>, DirectoryError> {
        self.inner.get(keys::POD_ID).await
    }

    pub async fn pod_url(&self) -> Result<Option<String>, DirectoryError> {
        self.inner.get(keys::POD_URL).await
    }

    pub async fn load(&self) -> Result<PodEntry, DirectoryError> {
        let pod_id = self.inner.get(keys::POD_ID).await?;
        if pod_id.is_none() {
            return Ok(PodEntry::default());
        }
        Ok(PodEntry {
            pod_id,
            pod_url: self.inner.get(keys::POD_URL).await?,
            last_activity: self.epoch_ms(keys::LAST_ACTIVITY).await?,
            start_time: self.epoch_ms(keys::START_TIME).await?,
            start_strategy: self
                .inner
                .get(keys::START_STRATEGY)
                .await?
                .and_then(|s| StartStrategy::parse(&s)),
        })
    }

    async fn epoch_ms(&self, key: &str) -> Result<Option<u64>, DirectoryError> {
        let Some(raw) = self.inner.get(key).await? else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(ms) => Ok(Some(ms)),
            Err(_) => {
                warn!(key, value = %raw, "ignoring unparseable timestamp in directory");
                Ok(None)
            }
        }
    }

    /// Record a pod that was just created or resumed: opens the grace window
    /// and the idle baseline at `now_ms`.
    pub async fn record_start(
        &self,
        pod_id: &str,
        strategy: StartStrategy,
        now_ms: u64,
    ) -> Result<(), DirectoryError> {
        let now = now_ms.to_string();
        self.inner.put(keys::POD_ID, pod_id).await?;
        self.inner.put(keys::LAST_ACTIVITY, &now).await?;
        self.inner.put(keys::START_TIME, &now).await?;
        self.inner.put(keys::START_STRATEGY, strategy.as_str()).await
    }

    /// Open a grace window for a pod whose start time was never recorded.
    pub async fn record_grace_window(
        &self,
        strategy: StartStrategy,
        now_ms: u64,
    ) -> Result<(), DirectoryError> {
        self.inner.put(keys::START_TIME, &now_ms.to_string()).await?;
        self.inner.put(keys::START_STRATEGY, strategy.as_str()).await
    }

    /// The pod is serving: persist its endpoint and close the grace window.
    pub async fn record_serving(&self, pod_url: Option<&str>) -> Result<(), DirectoryError> {
        if let Some(url) = pod_url {
            self.inner.put(keys::POD_URL, url).await?;
        }
        self.inner.delete(keys::START_TIME).await?;
        self.inner.delete(keys::START_STRATEGY).await
    }

    /// Stamp `lastActivity`.
    pub async fn touch(&self, now_ms: u64) -> Result<(), DirectoryError> {
        self.inner.put(keys::LAST_ACTIVITY, &now_ms.to_string()).await
    }

    /// Remove every runtime key, keeping `pod_id` for a later resume.
    pub async fn clear_runtime(&self) -> Result<(), DirectoryError> {
        for key in keys::RUNTIME {
            self.inner.delete(key).await?;
        }
        Ok(())
    }

    /// Remove every pod key.
    pub async fn clear_all(&self) -> Result<(), DirectoryError> {
        self.clear_runtime().await?;
        self.inner.delete(keys::POD_ID).await
    }
}

#[cfg(test)]
#[path = "pod_entry_tests.rs"]
mod tests;
