// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Holds jobs until an external dependency reports healthy.

use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Health {
    status: String,
    #[serde(default = "default_true")]
    model_loaded: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone)]
pub struct DependencyGate {
    client: reqwest::Client,
    health_url: Option<String>,
    poll_interval: Duration,
}

impl DependencyGate {
    /// A gate that is always open.
    pub fn open() -> Self {
        Self {
            client: reqwest::Client::new(),
            health_url: None,
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Gate on `GET {base_url}/api/v1/health`.
    pub fn new(base_url: &str, poll_interval: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
        let health_url = format!("{}/api/v1/health", base_url.trim_end_matches('/'));
        Ok(Self { client, health_url: Some(health_url), poll_interval })
    }

    pub fn is_gated(&self) -> bool {
        self.health_url.is_some()
    }

    /// One health check. Any transport error or non-ok body is unhealthy.
    pub async fn probe(&self) -> bool {
        let Some(url) = &self.health_url else {
            return true;
        };
        let response = match self.client.get(url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(url = %url, status = %r.status(), "dependency unhealthy");
                return false;
            }
            Err(e) => {
                debug!(url = %url, error = %e, "dependency unreachable");
                return false;
            }
        };
        match response.json::<Health>().await {
            Ok(health) => health.status == "ok" && health.model_loaded,
            Err(e) => {
                debug!(url = %url, error = %e, "dependency health undecodable");
                false
            }
        }
    }

    /// Poll until healthy, with no deadline. Returns `false` if cancelled
    /// first.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        let mut announced = false;
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            if self.probe().await {
                if announced {
                    info!("dependency healthy, releasing job");
                }
                return true;
            }
            if !announced {
                info!(
                    url = self.health_url.as_deref().unwrap_or_default(),
                    "waiting for dependency"
                );
                announced = true;
            }
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
