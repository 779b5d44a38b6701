// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod types: the provider's record, the coordinator's report, and the
//! GPU priority list used during fresh provisioning.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Desired status as reported by the GPU provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesiredStatus {
    Running,
    /// Stopped with the machine preserved; can be resumed.
    Exited,
    Terminated,
    #[serde(other)]
    Unknown,
}

impl DesiredStatus {
    /// Parse the provider's status string. Unrecognised values map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "RUNNING" => DesiredStatus::Running,
            "EXITED" => DesiredStatus::Exited,
            "TERMINATED" => DesiredStatus::Terminated,
            _ => DesiredStatus::Unknown,
        }
    }
}

crate::simple_display! {
    DesiredStatus {
        Running => "RUNNING",
        Exited => "EXITED",
        Terminated => "TERMINATED",
        Unknown => "UNKNOWN",
    }
}

/// Snapshot of a pod from a single provider query.
///
/// The provider is the source of truth: a `PodRecord` is used for one
/// reconciliation and then dropped, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRecord {
    pub id: String,
    pub desired_status: DesiredStatus,
    /// Zero while the container is still pulling or booting.
    pub uptime_secs: u64,
    pub gpu: Option<String>,
    /// Public endpoint, when the provider has assigned one.
    pub endpoint: Option<String>,
}

impl PodRecord {
    /// RUNNING with positive uptime: the container is actually serving.
    pub fn is_serving(&self) -> bool {
        self.desired_status == DesiredStatus::Running && self.uptime_secs > 0
    }
}

/// How the current pod was brought up. Decides the stuck-state grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartStrategy {
    Resume,
    Create,
}

impl StartStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            StartStrategy::Resume => "resume",
            StartStrategy::Create => "create",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resume" => Some(StartStrategy::Resume),
            "create" => Some(StartStrategy::Create),
            _ => None,
        }
    }
}

crate::simple_display! {
    StartStrategy {
        Resume => "resume",
        Create => "create",
    }
}

/// Phase reported to clients of the pod routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodPhase {
    Starting,
    Running,
    Stopped,
}

crate::simple_display! {
    PodPhase {
        Starting => "starting",
        Running => "running",
        Stopped => "stopped",
    }
}

/// Result of a start/status/stop call, serialized as the route's JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodReport {
    pub status: PodPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StartStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_id: Option<String>,
}

impl PodReport {
    fn phase(status: PodPhase) -> Self {
        Self {
            status,
            gpu: None,
            idle_minutes: None,
            elapsed_seconds: None,
            strategy: None,
            pod_id: None,
        }
    }

    pub fn stopped() -> Self {
        Self::phase(PodPhase::Stopped)
    }

    pub fn starting() -> Self {
        Self::phase(PodPhase::Starting)
    }

    pub fn running() -> Self {
        Self::phase(PodPhase::Running)
    }

    pub fn with_gpu(mut self, gpu: Option<String>) -> Self {
        self.gpu = gpu;
        self
    }

    pub fn with_pod_id(mut self, pod_id: impl Into<String>) -> Self {
        self.pod_id = Some(pod_id.into());
        self
    }

    pub fn with_idle_minutes(mut self, minutes: u64) -> Self {
        self.idle_minutes = Some(minutes);
        self
    }

    pub fn with_progress(mut self, elapsed_seconds: u64, strategy: StartStrategy) -> Self {
        self.elapsed_seconds = Some(elapsed_seconds);
        self.strategy = Some(strategy);
        self
    }
}

/// Ordered, immutable list of GPU type identifiers tried top-down when
/// provisioning a fresh pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuPriorityList(Arc<[String]>);

impl GpuPriorityList {
    pub fn new<I, S>(gpus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(gpus.into_iter().map(Into::into).collect())
    }

    /// Parse a comma-separated list, dropping blank entries.
    pub fn from_csv(s: &str) -> Self {
        Self::new(s.split(',').map(str::trim).filter(|g| !g.is_empty()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[path = "pod_tests.rs"]
mod tests;
