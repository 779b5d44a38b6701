// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-adapters: GPU provider client and subprocess control

pub mod provider;
pub mod subprocess;

pub use provider::{CreatePod, PodProvider, PodTemplate, ProviderError, RunPodProvider};
pub use subprocess::{run_with_timeout, SubprocessError};

#[cfg(any(test, feature = "test-support"))]
pub use provider::{FakeProvider, ProviderCall};
