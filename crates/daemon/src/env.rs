// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for both daemons.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use mp_core::Stage;

use crate::lifecycle::StartupError;

pub const DEFAULT_GPU_PRIORITY: &str =
    "NVIDIA GeForce RTX 4090,NVIDIA RTX A5000,NVIDIA RTX A4000";

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|s| s.trim().parse::<T>().ok())
}

/// Resolve state directory: MP_STATE_DIR > XDG_STATE_HOME/motionpod > ~/.local/state/motionpod
pub fn state_dir() -> Result<PathBuf, StartupError> {
    if let Some(dir) = var("MP_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("motionpod"));
    }
    let home = var("HOME").ok_or(StartupError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/motionpod"))
}

fn addr(name: &str, default: &str) -> Result<SocketAddr, StartupError> {
    let raw = var(name).unwrap_or_else(|| default.to_string());
    raw.parse().map_err(|_| StartupError::InvalidVar { name: name.to_string(), value: raw })
}

pub fn gateway_addr() -> Result<SocketAddr, StartupError> {
    addr("MP_GATEWAY_ADDR", "0.0.0.0:8080")
}

pub fn worker_addr() -> Result<SocketAddr, StartupError> {
    addr("MP_WORKER_ADDR", "0.0.0.0:8000")
}

pub fn provider_url() -> String {
    var("MP_PROVIDER_URL").unwrap_or_else(|| "https://api.runpod.io/graphql".to_string())
}

pub fn provider_api_key() -> Result<String, StartupError> {
    var("MP_PROVIDER_API_KEY").ok_or(StartupError::MissingVar("MP_PROVIDER_API_KEY"))
}

/// Comma-separated GPU types, most preferred first.
pub fn gpu_priority() -> String {
    var("MP_GPU_PRIORITY").unwrap_or_else(|| DEFAULT_GPU_PRIORITY.to_string())
}

pub fn pod_name() -> String {
    var("MP_POD_NAME").unwrap_or_else(|| "motionpod-worker".to_string())
}

pub fn pod_image() -> String {
    var("MP_POD_IMAGE").unwrap_or_else(|| "motionpod/worker:latest".to_string())
}

pub fn pod_disk_gb() -> u32 {
    parsed("MP_POD_DISK_GB").unwrap_or(40)
}

pub fn pod_volume_gb() -> u32 {
    parsed("MP_POD_VOLUME_GB").unwrap_or(50)
}

pub fn pod_port() -> u16 {
    parsed("MP_POD_PORT").unwrap_or(8000)
}

/// Idle time after which the reaper stops the pod (default 15 min).
pub fn idle_timeout() -> Duration {
    parsed("MP_IDLE_TIMEOUT_SECS").map(Duration::from_secs).unwrap_or(Duration::from_secs(15 * 60))
}

/// Reaper tick, clamped to 1..=5 minutes.
pub fn reaper_interval() -> Duration {
    let secs = parsed::<u64>("MP_REAPER_INTERVAL_SECS").unwrap_or(60).clamp(60, 300);
    Duration::from_secs(secs)
}

/// Result mirror tick (default 30s, at least 5s).
pub fn result_sync_interval() -> Duration {
    let secs = parsed::<u64>("MP_RESULT_SYNC_SECS").unwrap_or(30).max(5);
    Duration::from_secs(secs)
}

pub fn resume_stuck_after() -> Duration {
    parsed("MP_RESUME_STUCK_SECS").map(Duration::from_secs).unwrap_or(Duration::from_secs(120))
}

pub fn create_stuck_after() -> Duration {
    parsed("MP_CREATE_STUCK_SECS").map(Duration::from_secs).unwrap_or(Duration::from_secs(600))
}

/// How long the proxy waits for the worker's response headers.
pub fn proxy_timeout() -> Duration {
    parsed("MP_PROXY_TIMEOUT_MS").map(Duration::from_millis).unwrap_or(Duration::from_secs(30))
}

pub fn directory_path() -> Option<PathBuf> {
    var("MP_DIRECTORY_PATH").map(PathBuf::from)
}

pub fn results_dir() -> Option<PathBuf> {
    var("MP_RESULTS_DIR").map(PathBuf::from)
}

pub fn worker_slots() -> usize {
    parsed::<usize>("MP_WORKER_SLOTS").unwrap_or(1).max(1)
}

pub fn tools_dir() -> PathBuf {
    var("MP_TOOLS_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/opt/motionpod"))
}

pub fn preprocessor_url() -> Option<String> {
    var("MP_PREPROCESSOR_URL")
}

/// `MP_STAGE_<STAGE>_CMD` overrides, in stage order.
pub fn stage_overrides() -> Vec<(Stage, String)> {
    Stage::ALL
        .iter()
        .filter_map(|stage| {
            let name = format!("MP_STAGE_{}_CMD", stage.as_str().to_uppercase());
            var(&name).map(|cmd| (*stage, cmd))
        })
        .collect()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
