// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mp-worker: runs submitted jobs through the motion-capture pipeline on the
//! GPU pod.

use std::process::ExitCode;

use mp_daemon::{logging, worker, WorkerConfig};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match WorkerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mp-worker: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = match logging::init(&config.logs_dir, "mp-worker") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("mp-worker: failed to set up logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match worker::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "worker exited with error");
            ExitCode::FAILURE
        }
    }
}
