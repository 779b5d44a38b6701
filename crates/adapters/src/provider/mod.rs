// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GPU provider adapter: query, create, resume, stop and terminate pods.

mod runpod;

pub use runpod::RunPodProvider;

use async_trait::async_trait;
use mp_core::PodRecord;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from provider calls
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested GPU type has no free machines right now.
    #[error("no capacity for {gpu}: {message}")]
    Capacity { gpu: String, message: String },
    #[error("provider api error: {0}")]
    Api(String),
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn is_capacity(&self) -> bool {
        matches!(self, ProviderError::Capacity { .. })
    }
}

/// Everything needed to create a pod except the GPU type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTemplate {
    pub name: String,
    pub image: String,
    pub disk_gb: u32,
    pub volume_gb: u32,
    /// Container port exposed over the provider's HTTP proxy
    pub port: u16,
    pub env: BTreeMap<String, String>,
}

impl PodTemplate {
    pub fn for_gpu(&self, gpu: &str) -> CreatePod {
        CreatePod {
            name: self.name.clone(),
            image: self.image.clone(),
            gpu_type: gpu.to_string(),
            disk_gb: self.disk_gb,
            volume_gb: self.volume_gb,
            ports: format!("{}/http", self.port),
            env: self.env.clone(),
        }
    }
}

/// Arguments to [`PodProvider::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePod {
    pub name: String,
    pub image: String,
    pub gpu_type: String,
    pub disk_gb: u32,
    pub volume_gb: u32,
    pub ports: String,
    pub env: BTreeMap<String, String>,
}

/// Adapter for the external GPU provider.
///
/// `stop` preserves the machine so a later `resume` can reuse it;
/// `terminate` releases it. Neither waits for the provider to confirm.
#[async_trait]
pub trait PodProvider: Clone + Send + Sync + 'static {
    /// Current record, or `None` if the provider does not know the pod.
    async fn query(&self, pod_id: &str) -> Result<Option<PodRecord>, ProviderError>;

    /// Create a pod and return its id.
    async fn create(&self, spec: &CreatePod) -> Result<String, ProviderError>;

    /// Resume a stopped pod and return its id.
    async fn resume(&self, pod_id: &str) -> Result<String, ProviderError>;

    async fn stop(&self, pod_id: &str) -> Result<(), ProviderError>;

    async fn terminate(&self, pod_id: &str) -> Result<(), ProviderError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProvider, ProviderCall};
