// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral specs for motionpod.
//!
//! Each spec runs a real gateway and a real worker on loopback ports and
//! drives them over HTTP. The GPU provider is the in-memory fake and the
//! pipeline tools are replaced with `touch`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/idle_reaping.rs"]
mod idle_reaping;
#[path = "specs/job_session.rs"]
mod job_session;
#[path = "specs/pod_lifecycle.rs"]
mod pod_lifecycle;
