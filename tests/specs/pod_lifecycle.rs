// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod start, status and stop as seen by a client of the gateway.

use crate::prelude::*;

#[tokio::test]
async fn start_falls_back_to_next_gpu_when_first_is_exhausted() {
    let stack = Stack::start(&["GPU A", "GPU B"]).await;
    stack.provider.exhaust_gpu("GPU A");

    let started = stack.pod("start").await;

    assert_eq!(started["status"], "starting");
    assert_eq!(started["gpu"], "GPU B");
}

#[tokio::test]
async fn start_with_no_capacity_anywhere_is_503() {
    let stack = Stack::start(&["GPU A", "GPU B"]).await;
    stack.provider.exhaust_gpu("GPU A");
    stack.provider.exhaust_gpu("GPU B");

    let resp = stack.http.post(stack.url("/api/pod/start")).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn booting_pod_reports_starting_until_it_serves() {
    let stack = Stack::start(&["GPU A"]).await;
    let pod_id = stack.pod("start").await["podId"].as_str().unwrap().to_string();
    stack.clock.advance(Duration::from_secs(45));

    let status = stack.pod("status").await;
    assert_eq!(status["status"], "starting");
    assert_eq!(status["elapsedSeconds"], 45);
    assert_eq!(status["strategy"], "create");

    stack.boot(&pod_id);
    let status = stack.pod("status").await;
    assert_eq!(status["status"], "running");
    assert_eq!(status["idleMinutes"], 0);
}

#[tokio::test]
async fn stop_reports_stopped_before_the_provider_confirms() {
    let stack = Stack::start(&["GPU A"]).await;
    let pod_id = stack.running_pod().await;
    stack.provider.defer_stops();

    assert_eq!(stack.pod("stop").await["status"], "stopped");

    // Provider still says RUNNING; the gateway must not.
    assert_eq!(stack.provider.pod(&pod_id).unwrap().desired_status, DesiredStatus::Running);
    assert_eq!(stack.pod("status").await["status"], "stopped");
    assert_eq!(stack.pods.load().await.unwrap().pod_url, None);
}

#[tokio::test]
async fn stopped_pod_is_resumed_on_the_same_machine() {
    let stack = Stack::start(&["GPU A"]).await;
    let pod_id = stack.running_pod().await;
    stack.pod("stop").await;

    let started = stack.pod("start").await;

    assert_eq!(started["status"], "starting");
    assert_eq!(started["podId"], pod_id.as_str());
    assert_eq!(stack.provider.pod_count(), 1);
}

#[tokio::test]
async fn preflight_is_answered_by_the_gateway() {
    let stack = Stack::start(&["GPU A"]).await;

    let resp = stack
        .http
        .request(reqwest::Method::OPTIONS, stack.url("/api/jobs"))
        .header("origin", "https://app.example")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}
