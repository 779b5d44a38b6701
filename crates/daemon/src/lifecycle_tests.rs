// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn lock_writes_pid_and_removes_on_drop() {
    let dir = TempDir::new().unwrap();
    let lock = PidLock::acquire(dir.path(), "mp-worker").unwrap();
    let path = lock.path().to_path_buf();

    let pid = std::fs::read_to_string(&path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    drop(lock);
    assert!(!path.exists());
}

#[test]
fn second_lock_fails_and_keeps_pid() {
    let dir = TempDir::new().unwrap();
    let _held = PidLock::acquire(dir.path(), "mp-gateway").unwrap();

    let err = PidLock::acquire(dir.path(), "mp-gateway").err().unwrap();
    assert!(matches!(err, StartupError::LockFailed(ref name, _) if name == "mp-gateway"));

    let pid = std::fs::read_to_string(dir.path().join("mp-gateway.pid")).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
}

#[test]
fn locks_are_per_daemon() {
    let dir = TempDir::new().unwrap();
    let _gateway = PidLock::acquire(dir.path(), "mp-gateway").unwrap();
    let _worker = PidLock::acquire(dir.path(), "mp-worker").unwrap();
}
