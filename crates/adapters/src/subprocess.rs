// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with a wall-clock deadline and cancellation.
//!
//! Each command runs in its own process group. On deadline or cancellation
//! the whole group is killed, not just the immediate child, so tools that
//! fork workers (ffmpeg, blender, python) do not outlive their stage.

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{label}: failed to spawn: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{label}: io error while waiting: {source}")]
    Wait {
        label: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{label}: timed out after {}s", .timeout.as_secs())]
    Timeout { label: String, timeout: Duration },
    #[error("{label}: cancelled")]
    Cancelled { label: String },
}

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// A non-zero exit is not an error here; callers inspect `Output::status`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    cancel: &CancellationToken,
    label: &str,
) -> Result<Output, SubprocessError> {
    cmd.process_group(0)
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = cmd
        .spawn()
        .map_err(|source| SubprocessError::Spawn { label: label.to_string(), source })?;
    let pgid = child.id();
    let wait = child.wait_with_output();
    tokio::pin!(wait);

    tokio::select! {
        result = &mut wait => {
            result.map_err(|source| SubprocessError::Wait { label: label.to_string(), source })
        }
        _ = tokio::time::sleep(timeout) => {
            kill_group(pgid, label);
            Err(SubprocessError::Timeout { label: label.to_string(), timeout })
        }
        _ = cancel.cancelled() => {
            kill_group(pgid, label);
            Err(SubprocessError::Cancelled { label: label.to_string() })
        }
    }
}

fn kill_group(pgid: Option<u32>, label: &str) {
    let Some(pgid) = pgid else { return };
    let Ok(raw) = i32::try_from(pgid) else { return };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => tracing::warn!(label, pgid, "killed process group"),
        // ESRCH: the group already exited
        Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => tracing::warn!(label, pgid, error = %e, "failed to kill process group"),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
