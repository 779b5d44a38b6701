// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, assembled from the environment.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use mp_adapters::PodTemplate;
use mp_core::{GpuPriorityList, Stage};
use mp_engine::{CoordinatorConfig, PipelineConfig};

use crate::env;
use crate::lifecycle::StartupError;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Root state directory (e.g. ~/.local/state/motionpod)
    pub state_dir: PathBuf,
    pub listen: SocketAddr,
    pub provider_url: String,
    pub provider_api_key: String,
    pub coordinator: CoordinatorConfig,
    pub idle_timeout: Duration,
    pub reaper_interval: Duration,
    /// How often finished results are copied off the serving pod
    pub result_sync_interval: Duration,
    pub proxy_timeout: Duration,
    /// Shared key/value store for pod state
    pub directory_path: PathBuf,
    pub results_dir: PathBuf,
    /// Directory for the daemon log
    pub logs_dir: PathBuf,
}

impl GatewayConfig {
    pub fn load() -> Result<Self, StartupError> {
        let state_dir = env::state_dir()?;
        let port = env::pod_port();
        let template = PodTemplate {
            name: env::pod_name(),
            image: env::pod_image(),
            disk_gb: env::pod_disk_gb(),
            volume_gb: env::pod_volume_gb(),
            port,
            env: BTreeMap::from([("MP_WORKER_ADDR".to_string(), format!("0.0.0.0:{port}"))]),
        };
        let gpus = GpuPriorityList::from_csv(&env::gpu_priority());
        if gpus.is_empty() {
            return Err(StartupError::InvalidVar {
                name: "MP_GPU_PRIORITY".to_string(),
                value: env::gpu_priority(),
            });
        }

        Ok(Self {
            listen: env::gateway_addr()?,
            provider_url: env::provider_url(),
            provider_api_key: env::provider_api_key()?,
            coordinator: CoordinatorConfig {
                gpus,
                template,
                resume_stuck_after: env::resume_stuck_after(),
                create_stuck_after: env::create_stuck_after(),
            },
            idle_timeout: env::idle_timeout(),
            reaper_interval: env::reaper_interval(),
            result_sync_interval: env::result_sync_interval(),
            proxy_timeout: env::proxy_timeout(),
            directory_path: env::directory_path()
                .unwrap_or_else(|| state_dir.join("directory.json")),
            results_dir: env::results_dir().unwrap_or_else(|| state_dir.join("results")),
            logs_dir: state_dir.join("logs"),
            state_dir,
        })
    }
}

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub state_dir: PathBuf,
    pub listen: SocketAddr,
    /// Concurrent pipeline executions
    pub slots: usize,
    pub tools_dir: PathBuf,
    pub preprocessor_url: Option<String>,
    pub stage_overrides: Vec<(Stage, String)>,
    /// Job snapshot file
    pub jobs_path: PathBuf,
    /// Per-job working directories
    pub work_root: PathBuf,
    pub results_dir: PathBuf,
    /// Daemon log and per-job activity logs
    pub logs_dir: PathBuf,
}

impl WorkerConfig {
    pub fn load() -> Result<Self, StartupError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            listen: env::worker_addr()?,
            slots: env::worker_slots(),
            tools_dir: env::tools_dir(),
            preprocessor_url: env::preprocessor_url(),
            stage_overrides: env::stage_overrides(),
            jobs_path: state_dir.join("jobs.json"),
            work_root: state_dir.join("work"),
            results_dir: env::results_dir().unwrap_or_else(|| state_dir.join("results")),
            logs_dir: state_dir.join("logs"),
            state_dir,
        })
    }

    /// Pipeline with any per-stage command overrides applied.
    pub fn pipeline(&self) -> PipelineConfig {
        let mut pipeline = PipelineConfig::new(&self.tools_dir, self.preprocessor_url.clone());
        for (stage, command) in &self.stage_overrides {
            pipeline.override_stage(*stage, command);
        }
        pipeline
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
