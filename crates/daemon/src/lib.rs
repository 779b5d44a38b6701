// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-daemon: the `mp-gateway` and `mp-worker` HTTP daemons.

pub mod config;
pub mod env;
pub mod error;
pub mod files;
pub mod gateway;
pub mod lifecycle;
pub mod logging;
pub mod worker;

pub use config::{GatewayConfig, WorkerConfig};
pub use error::ApiError;
pub use gateway::GatewayState;
pub use lifecycle::StartupError;
pub use worker::WorkerState;
