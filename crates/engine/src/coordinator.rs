// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod lifecycle coordinator: start, status and stop.
//!
//! Every call re-derives pod state from a fresh provider query; the
//! directory is a cache of what the last handler learned, never trusted on
//! its own. Handlers are not mutually excluded, so two concurrent `start`
//! calls that both see no `pod_id` will both provision.

use mp_adapters::{PodProvider, PodTemplate, ProviderError};
use mp_core::{Clock, DesiredStatus, GpuPriorityList, PodRecord, PodReport, StartStrategy};
use mp_storage::{DirectoryError, PodDirectory, PodEntry};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Errors surfaced to pod-route callers
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no GPU capacity available (tried: {})", .tried.join(", "))]
    CapacityExhausted { tried: Vec<String> },
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub gpus: GpuPriorityList,
    pub template: PodTemplate,
    /// Grace period for a resumed pod to report uptime
    pub resume_stuck_after: Duration,
    /// Grace period for a freshly created pod (image pulls are slow)
    pub create_stuck_after: Duration,
}

impl CoordinatorConfig {
    pub fn stuck_after(&self, strategy: StartStrategy) -> Duration {
        match strategy {
            StartStrategy::Resume => self.resume_stuck_after,
            StartStrategy::Create => self.create_stuck_after,
        }
    }
}

/// A pod that reported RUNNING without uptime for longer than its strategy allows.
#[derive(Debug)]
struct StuckPod {
    strategy: StartStrategy,
    elapsed: Duration,
    limit: Duration,
}

/// Where a booting pod (RUNNING, zero uptime) stands against its grace period.
#[derive(Debug)]
enum Boot {
    Waiting { elapsed: Duration, strategy: StartStrategy },
    Stuck(StuckPod),
}

pub struct PodCoordinator<P: PodProvider, C: Clock> {
    provider: P,
    pods: PodDirectory,
    clock: C,
    config: Arc<CoordinatorConfig>,
}

impl<P: PodProvider, C: Clock> Clone for PodCoordinator<P, C> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            pods: self.pods.clone(),
            clock: self.clock.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<P: PodProvider, C: Clock> PodCoordinator<P, C> {
    pub fn new(provider: P, pods: PodDirectory, clock: C, config: CoordinatorConfig) -> Self {
        Self { provider, pods, clock, config: Arc::new(config) }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn pods(&self) -> &PodDirectory {
        &self.pods
    }

    /// Bring a pod up: reuse a running one, resume a stopped one, or
    /// provision a fresh one. Recovers stuck and vanished pods by replacing
    /// them.
    pub async fn start(&self) -> Result<PodReport, LifecycleError> {
        let entry = self.pods.load().await?;
        let Some(pod_id) = entry.pod_id.clone() else {
            return self.create_fresh_pod().await;
        };

        let Some(record) = self.provider.query(&pod_id).await? else {
            info!(pod_id, "pod no longer exists at provider, provisioning a new one");
            self.pods.clear_all().await?;
            return self.create_fresh_pod().await;
        };

        match record.desired_status {
            // Stop requested but not yet applied: take the pod back into
            // service so status and the proxy agree with this report.
            DesiredStatus::Running if record.uptime_secs > 0 && entry.is_parked() => {
                info!(pod_id, "start during pending stop, serving again");
                self.record_serving(&entry, &record).await
            }
            DesiredStatus::Running if record.uptime_secs > 0 => {
                Ok(PodReport::running().with_gpu(record.gpu).with_pod_id(pod_id))
            }
            DesiredStatus::Running => match self.boot_progress(&entry).await? {
                Boot::Waiting { elapsed, strategy } => Ok(PodReport::starting()
                    .with_gpu(record.gpu)
                    .with_progress(elapsed.as_secs(), strategy)
                    .with_pod_id(pod_id)),
                Boot::Stuck(stuck) => {
                    warn!(
                        pod_id,
                        strategy = %stuck.strategy,
                        elapsed_secs = stuck.elapsed.as_secs(),
                        limit_secs = stuck.limit.as_secs(),
                        "pod stuck without uptime, replacing"
                    );
                    self.replace(&pod_id).await
                }
            },
            DesiredStatus::Exited => match self.provider.resume(&pod_id).await {
                Ok(resumed_id) => {
                    let now = self.clock.epoch_ms();
                    self.pods.record_start(&resumed_id, StartStrategy::Resume, now).await?;
                    info!(pod_id = %resumed_id, "resumed stopped pod");
                    Ok(PodReport::starting().with_gpu(record.gpu).with_pod_id(resumed_id))
                }
                Err(e) => {
                    warn!(pod_id, error = %e, "resume failed, replacing pod");
                    self.replace(&pod_id).await
                }
            },
            DesiredStatus::Terminated | DesiredStatus::Unknown => {
                info!(pod_id, status = %record.desired_status, "pod unusable, replacing");
                self.replace(&pod_id).await
            }
        }
    }

    /// Reconcile the directory against the provider and report the phase.
    pub async fn status(&self) -> Result<PodReport, LifecycleError> {
        let entry = self.pods.load().await?;
        let Some(pod_id) = entry.pod_id.clone() else {
            return Ok(PodReport::stopped());
        };

        let Some(record) = self.provider.query(&pod_id).await? else {
            info!(pod_id, "pod no longer exists at provider, clearing directory");
            self.pods.clear_all().await?;
            return Ok(PodReport::stopped());
        };

        match record.desired_status {
            // A stop was requested and the provider has not caught up yet.
            DesiredStatus::Running if entry.is_parked() => {
                Ok(PodReport::stopped().with_pod_id(pod_id))
            }
            DesiredStatus::Running if record.uptime_secs > 0 => {
                self.record_serving(&entry, &record).await
            }
            DesiredStatus::Running => match self.boot_progress(&entry).await? {
                Boot::Waiting { elapsed, strategy } => Ok(PodReport::starting()
                    .with_gpu(record.gpu)
                    .with_progress(elapsed.as_secs(), strategy)
                    .with_pod_id(pod_id)),
                Boot::Stuck(stuck) => {
                    warn!(
                        pod_id,
                        strategy = %stuck.strategy,
                        elapsed_secs = stuck.elapsed.as_secs(),
                        "pod stuck without uptime, terminating"
                    );
                    self.terminate_quietly(&pod_id).await;
                    self.pods.clear_all().await?;
                    Ok(PodReport::stopped())
                }
            },
            DesiredStatus::Exited => {
                self.pods.clear_runtime().await?;
                Ok(PodReport::stopped().with_pod_id(pod_id))
            }
            DesiredStatus::Terminated | DesiredStatus::Unknown => {
                self.pods.clear_all().await?;
                Ok(PodReport::stopped())
            }
        }
    }

    /// Request a machine-preserving stop and report stopped immediately.
    ///
    /// Provider errors are surfaced and leave the directory untouched.
    pub async fn stop(&self) -> Result<PodReport, LifecycleError> {
        let Some(pod_id) = self.pods.pod_id().await? else {
            return Ok(PodReport::stopped());
        };
        self.provider.stop(&pod_id).await?;
        self.pods.clear_runtime().await?;
        info!(pod_id, "stop requested");
        Ok(PodReport::stopped().with_pod_id(pod_id))
    }

    /// Provision on the first GPU type in priority order that has capacity.
    pub async fn create_fresh_pod(&self) -> Result<PodReport, LifecycleError> {
        let mut tried = Vec::with_capacity(self.config.gpus.len());
        let mut last_error = None;

        for gpu in self.config.gpus.iter() {
            match self.provider.create(&self.config.template.for_gpu(gpu)).await {
                Ok(pod_id) => {
                    let now = self.clock.epoch_ms();
                    self.pods.record_start(&pod_id, StartStrategy::Create, now).await?;
                    info!(pod_id, gpu, "created pod");
                    return Ok(PodReport::starting()
                        .with_gpu(Some(gpu.to_string()))
                        .with_progress(0, StartStrategy::Create)
                        .with_pod_id(pod_id));
                }
                Err(e) => {
                    warn!(gpu, error = %e, "provisioning failed, trying next GPU type");
                    tried.push(gpu.to_string());
                    if !e.is_capacity() {
                        last_error = Some(e);
                    }
                }
            }
        }

        // Only a run of pure capacity misses is reported as exhaustion.
        match last_error {
            Some(e) => Err(LifecycleError::Provider(e)),
            None => Err(LifecycleError::CapacityExhausted { tried }),
        }
    }

    async fn record_serving(
        &self,
        entry: &PodEntry,
        record: &PodRecord,
    ) -> Result<PodReport, LifecycleError> {
        let now = self.clock.epoch_ms();
        self.pods.record_serving(record.endpoint.as_deref()).await?;
        let last_activity = match entry.last_activity {
            Some(ms) => ms,
            None => {
                self.pods.touch(now).await?;
                now
            }
        };
        let idle = self.clock.elapsed_since_ms(last_activity);
        Ok(PodReport::running()
            .with_gpu(record.gpu.clone())
            .with_idle_minutes(idle.as_secs() / 60)
            .with_pod_id(record.id.clone()))
    }

    async fn boot_progress(&self, entry: &PodEntry) -> Result<Boot, DirectoryError> {
        let (Some(start_time), Some(strategy)) = (entry.start_time, entry.start_strategy) else {
            // Nothing recorded: open a fresh window rather than guess.
            let now = self.clock.epoch_ms();
            self.pods.record_grace_window(StartStrategy::Create, now).await?;
            return Ok(Boot::Waiting { elapsed: Duration::ZERO, strategy: StartStrategy::Create });
        };

        let elapsed = self.clock.elapsed_since_ms(start_time);
        let limit = self.config.stuck_after(strategy);
        if elapsed > limit {
            Ok(Boot::Stuck(StuckPod { strategy, elapsed, limit }))
        } else {
            Ok(Boot::Waiting { elapsed, strategy })
        }
    }

    async fn replace(&self, pod_id: &str) -> Result<PodReport, LifecycleError> {
        self.terminate_quietly(pod_id).await;
        self.pods.clear_all().await?;
        self.create_fresh_pod().await
    }

    async fn terminate_quietly(&self, pod_id: &str) {
        if let Err(e) = self.provider.terminate(pod_id).await {
            warn!(pod_id, error = %e, "terminate failed, continuing");
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
