// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory provider for tests.

use super::{CreatePod, PodProvider, ProviderError};
use async_trait::async_trait;
use mp_core::{DesiredStatus, PodRecord};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Query(String),
    Create { gpu: String },
    Resume(String),
    Stop(String),
    Terminate(String),
}

#[derive(Default)]
struct FakeProviderState {
    pods: BTreeMap<String, PodRecord>,
    calls: Vec<ProviderCall>,
    exhausted_gpus: HashSet<String>,
    broken_gpus: HashSet<String>,
    fail_resume: bool,
    fail_stop: bool,
    fail_terminate: bool,
    fail_query: bool,
    defer_stops: bool,
    next_id: u32,
}

/// Fake provider: pods live in a map, failures are scripted per test.
///
/// `create` and `resume` leave the pod RUNNING with zero uptime (booting);
/// tests move it along with [`FakeProvider::set_status`].
#[derive(Clone, Default)]
pub struct FakeProvider {
    inner: Arc<Mutex<FakeProviderState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a pod record.
    pub fn insert_pod(&self, record: PodRecord) {
        self.inner.lock().pods.insert(record.id.clone(), record);
    }

    pub fn set_status(&self, pod_id: &str, status: DesiredStatus, uptime_secs: u64) {
        if let Some(pod) = self.inner.lock().pods.get_mut(pod_id) {
            pod.desired_status = status;
            pod.uptime_secs = uptime_secs;
        }
    }

    /// Forget a pod, as if the provider deleted it out of band.
    pub fn remove_pod(&self, pod_id: &str) {
        self.inner.lock().pods.remove(pod_id);
    }

    pub fn pod(&self, pod_id: &str) -> Option<PodRecord> {
        self.inner.lock().pods.get(pod_id).cloned()
    }

    pub fn pod_count(&self) -> usize {
        self.inner.lock().pods.len()
    }

    /// Make `create` fail with a capacity error for this GPU type.
    pub fn exhaust_gpu(&self, gpu: &str) {
        self.inner.lock().exhausted_gpus.insert(gpu.to_string());
    }

    /// Make `create` fail with a non-capacity API error for this GPU type.
    pub fn break_gpu(&self, gpu: &str) {
        self.inner.lock().broken_gpus.insert(gpu.to_string());
    }

    pub fn fail_resume(&self) {
        self.inner.lock().fail_resume = true;
    }

    pub fn fail_stop(&self) {
        self.inner.lock().fail_stop = true;
    }

    pub fn fail_terminate(&self) {
        self.inner.lock().fail_terminate = true;
    }

    /// Accept `stop` calls without changing the pod, like a provider that
    /// has not applied the stop yet.
    pub fn defer_stops(&self) {
        self.inner.lock().defer_stops = true;
    }

    pub fn fail_query(&self, fail: bool) {
        self.inner.lock().fail_query = fail;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.inner.lock().calls.clone()
    }

    /// Recorded calls other than queries
    pub fn mutations(&self) -> Vec<ProviderCall> {
        self.calls().into_iter().filter(|c| !matches!(c, ProviderCall::Query(_))).collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }
}

#[async_trait]
impl PodProvider for FakeProvider {
    async fn query(&self, pod_id: &str) -> Result<Option<PodRecord>, ProviderError> {
        let mut state = self.inner.lock();
        state.calls.push(ProviderCall::Query(pod_id.to_string()));
        if state.fail_query {
            return Err(ProviderError::Api("query failed".to_string()));
        }
        Ok(state.pods.get(pod_id).cloned())
    }

    async fn create(&self, spec: &CreatePod) -> Result<String, ProviderError> {
        let mut state = self.inner.lock();
        state.calls.push(ProviderCall::Create { gpu: spec.gpu_type.clone() });
        if state.exhausted_gpus.contains(&spec.gpu_type) {
            return Err(ProviderError::Capacity {
                gpu: spec.gpu_type.clone(),
                message: "no longer any instances available".to_string(),
            });
        }
        if state.broken_gpus.contains(&spec.gpu_type) {
            return Err(ProviderError::Api("invalid gpu type".to_string()));
        }
        state.next_id += 1;
        let id = format!("pod{}", state.next_id);
        state.pods.insert(
            id.clone(),
            PodRecord {
                id: id.clone(),
                desired_status: DesiredStatus::Running,
                uptime_secs: 0,
                gpu: Some(spec.gpu_type.clone()),
                endpoint: Some(format!("https://{id}-8000.proxy.test")),
            },
        );
        Ok(id)
    }

    async fn resume(&self, pod_id: &str) -> Result<String, ProviderError> {
        let mut state = self.inner.lock();
        state.calls.push(ProviderCall::Resume(pod_id.to_string()));
        if state.fail_resume {
            return Err(ProviderError::Api("resume failed".to_string()));
        }
        match state.pods.get_mut(pod_id) {
            Some(pod) => {
                pod.desired_status = DesiredStatus::Running;
                pod.uptime_secs = 0;
                Ok(pod_id.to_string())
            }
            None => Err(ProviderError::Api(format!("pod {pod_id} not found"))),
        }
    }

    async fn stop(&self, pod_id: &str) -> Result<(), ProviderError> {
        let mut state = self.inner.lock();
        state.calls.push(ProviderCall::Stop(pod_id.to_string()));
        if state.fail_stop {
            return Err(ProviderError::Api("stop failed".to_string()));
        }
        if state.defer_stops {
            return Ok(());
        }
        if let Some(pod) = state.pods.get_mut(pod_id) {
            pod.desired_status = DesiredStatus::Exited;
            pod.uptime_secs = 0;
        }
        Ok(())
    }

    async fn terminate(&self, pod_id: &str) -> Result<(), ProviderError> {
        let mut state = self.inner.lock();
        state.calls.push(ProviderCall::Terminate(pod_id.to_string()));
        if state.fail_terminate {
            return Err(ProviderError::Api("terminate failed".to_string()));
        }
        state.pods.remove(pod_id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
