// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle reaper: stops a running pod nobody has used for a while.

use crate::coordinator::LifecycleError;
use mp_adapters::PodProvider;
use mp_core::{Clock, DesiredStatus};
use mp_storage::PodDirectory;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a single reaper pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReapOutcome {
    /// No pod recorded
    NoPod,
    /// Pod is stopped; stale runtime keys were pruned
    Pruned,
    /// Pod vanished or is in an unknown state; directory cleared
    Cleaned,
    /// Pod is running and was used recently
    Active { idle: Duration },
    /// Pod was idle past the threshold and a stop was issued.
    /// `idle` is `None` when no activity was ever recorded.
    Stopped { idle: Option<Duration> },
    /// Pod is in some other state (e.g. terminating); left alone
    Skipped(DesiredStatus),
}

pub struct IdleReaper<P: PodProvider, C: Clock> {
    provider: P,
    pods: PodDirectory,
    clock: C,
    idle_timeout: Duration,
}

impl<P: PodProvider, C: Clock> IdleReaper<P, C> {
    pub fn new(provider: P, pods: PodDirectory, clock: C, idle_timeout: Duration) -> Self {
        Self { provider, pods, clock, idle_timeout }
    }

    /// One reconciliation pass.
    pub async fn tick(&self) -> Result<ReapOutcome, LifecycleError> {
        let entry = self.pods.load().await?;
        let Some(pod_id) = entry.pod_id else {
            return Ok(ReapOutcome::NoPod);
        };

        let Some(record) = self.provider.query(&pod_id).await? else {
            self.pods.clear_all().await?;
            info!(pod_id, "reaper: pod vanished, directory cleared");
            return Ok(ReapOutcome::Cleaned);
        };

        match record.desired_status {
            DesiredStatus::Exited => {
                self.pods.clear_runtime().await?;
                Ok(ReapOutcome::Pruned)
            }
            DesiredStatus::Unknown => {
                self.pods.clear_all().await?;
                info!(pod_id, "reaper: pod state unknown, directory cleared");
                Ok(ReapOutcome::Cleaned)
            }
            DesiredStatus::Running => {
                let idle = entry.last_activity.map(|ms| self.clock.elapsed_since_ms(ms));
                match idle {
                    Some(idle) if idle <= self.idle_timeout => Ok(ReapOutcome::Active { idle }),
                    _ => {
                        self.provider.stop(&pod_id).await?;
                        self.pods.clear_runtime().await?;
                        info!(
                            pod_id,
                            idle_secs = idle.map(|d| d.as_secs()),
                            "reaper: stopped idle pod"
                        );
                        Ok(ReapOutcome::Stopped { idle })
                    }
                }
            }
            other => Ok(ReapOutcome::Skipped(other)),
        }
    }

    /// Run [`tick`](Self::tick) every `interval` until `cancel` fires.
    ///
    /// A failed pass is logged and the loop keeps going.
    pub fn spawn(self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => match self.tick().await {
                        Ok(outcome) => debug!(?outcome, "reaper pass"),
                        Err(e) => warn!(error = %e, "reaper pass failed"),
                    },
                }
            }
            debug!("reaper stopped");
        })
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
