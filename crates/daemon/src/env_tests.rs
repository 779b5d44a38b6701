// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear(names: &[&str]) {
    for name in names {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    std::env::set_var("MP_STATE_DIR", "/srv/motionpod");
    std::env::set_var("XDG_STATE_HOME", "/xdg");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/srv/motionpod"));

    std::env::remove_var("MP_STATE_DIR");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/xdg/motionpod"));
    clear(&["XDG_STATE_HOME"]);
}

#[test]
#[serial]
fn defaults_apply_when_unset() {
    clear(&[
        "MP_GPU_PRIORITY",
        "MP_IDLE_TIMEOUT_SECS",
        "MP_REAPER_INTERVAL_SECS",
        "MP_RESULT_SYNC_SECS",
        "MP_PROXY_TIMEOUT_MS",
        "MP_WORKER_SLOTS",
        "MP_GATEWAY_ADDR",
    ]);
    assert_eq!(gpu_priority(), DEFAULT_GPU_PRIORITY);
    assert_eq!(idle_timeout(), Duration::from_secs(900));
    assert_eq!(reaper_interval(), Duration::from_secs(60));
    assert_eq!(result_sync_interval(), Duration::from_secs(30));
    assert_eq!(proxy_timeout(), Duration::from_secs(30));
    assert_eq!(worker_slots(), 1);
    assert_eq!(gateway_addr().unwrap(), "0.0.0.0:8080".parse().unwrap());
}

#[test]
#[serial]
fn reaper_interval_is_clamped() {
    std::env::set_var("MP_REAPER_INTERVAL_SECS", "5");
    assert_eq!(reaper_interval(), Duration::from_secs(60));
    std::env::set_var("MP_REAPER_INTERVAL_SECS", "3600");
    assert_eq!(reaper_interval(), Duration::from_secs(300));
    clear(&["MP_REAPER_INTERVAL_SECS"]);
}

#[test]
#[serial]
fn result_sync_interval_has_a_floor() {
    std::env::set_var("MP_RESULT_SYNC_SECS", "1");
    assert_eq!(result_sync_interval(), Duration::from_secs(5));
    std::env::set_var("MP_RESULT_SYNC_SECS", "120");
    assert_eq!(result_sync_interval(), Duration::from_secs(120));
    clear(&["MP_RESULT_SYNC_SECS"]);
}

#[test]
#[serial]
fn unparseable_numbers_fall_back() {
    std::env::set_var("MP_WORKER_SLOTS", "lots");
    std::env::set_var("MP_POD_PORT", "99999");
    assert_eq!(worker_slots(), 1);
    assert_eq!(pod_port(), 8000);
    clear(&["MP_WORKER_SLOTS", "MP_POD_PORT"]);
}

#[test]
#[serial]
fn invalid_address_is_an_error() {
    std::env::set_var("MP_WORKER_ADDR", "not-an-addr");
    assert!(matches!(worker_addr(), Err(StartupError::InvalidVar { .. })));
    clear(&["MP_WORKER_ADDR"]);
}

#[test]
#[serial]
fn missing_api_key_is_an_error() {
    clear(&["MP_PROVIDER_API_KEY"]);
    assert!(matches!(provider_api_key(), Err(StartupError::MissingVar("MP_PROVIDER_API_KEY"))));
}

#[test]
#[serial]
fn stage_overrides_are_read_per_stage() {
    std::env::set_var("MP_STAGE_BUILD_CMD", "touch ${workdir}/result.glb");
    std::env::set_var("MP_STAGE_RENDER_CMD", "  ");
    assert_eq!(
        stage_overrides(),
        vec![(Stage::Build, "touch ${workdir}/result.glb".to_string())]
    );
    clear(&["MP_STAGE_BUILD_CMD", "MP_STAGE_RENDER_CMD"]);
}
