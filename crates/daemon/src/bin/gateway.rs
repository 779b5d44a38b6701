// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mp-gateway: always-on front door that starts, proxies to and reaps the
//! GPU pod.

use std::process::ExitCode;

use mp_daemon::{gateway, logging, GatewayConfig};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match GatewayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mp-gateway: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = match logging::init(&config.logs_dir, "mp-gateway") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("mp-gateway: failed to set up logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match gateway::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gateway exited with error");
            ExitCode::FAILURE
        }
    }
}
