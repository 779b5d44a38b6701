// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traffic through the gateway keeps the pod alive; silence stops it.

use crate::prelude::*;

#[tokio::test]
async fn proxied_traffic_defers_the_reaper() {
    let stack = Stack::start(&["GPU A"]).await;
    stack.running_pod().await;

    stack.clock.advance(Duration::from_secs(14 * 60));
    assert_eq!(stack.get("/api/jobs").await.status(), StatusCode::OK);
    stack.clock.advance(Duration::from_secs(10 * 60));

    let outcome = stack.reaper.tick().await.unwrap();

    assert_eq!(outcome, ReapOutcome::Active { idle: Duration::from_secs(10 * 60) });
}

#[tokio::test]
async fn idle_pod_is_stopped_and_resumable() {
    let stack = Stack::start(&["GPU A"]).await;
    let pod_id = stack.running_pod().await;
    stack.clock.advance(Duration::from_secs(16 * 60));

    let outcome = stack.reaper.tick().await.unwrap();

    assert_eq!(outcome, ReapOutcome::Stopped { idle: Some(Duration::from_secs(16 * 60)) });
    assert_eq!(stack.provider.pod(&pod_id).unwrap().desired_status, DesiredStatus::Exited);
    let entry = stack.pods.load().await.unwrap();
    assert_eq!(entry.pod_id.as_deref(), Some(pod_id.as_str()));
    assert!(entry.is_parked());

    assert_eq!(stack.pod("status").await["status"], "stopped");
    assert_eq!(stack.get("/api/jobs").await.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn status_polls_do_not_count_as_activity() {
    let stack = Stack::start(&["GPU A"]).await;
    stack.running_pod().await;

    for _ in 0..4 {
        stack.clock.advance(Duration::from_secs(4 * 60));
        stack.pod("status").await;
    }

    let outcome = stack.reaper.tick().await.unwrap();
    assert_eq!(outcome, ReapOutcome::Stopped { idle: Some(Duration::from_secs(16 * 60)) });
}
