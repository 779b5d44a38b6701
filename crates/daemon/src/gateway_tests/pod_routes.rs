// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mp_core::DesiredStatus;

#[tokio::test]
async fn status_without_pod_is_stopped() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;

    let resp = reqwest::get(h.url("/api/pod/status")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "status": "stopped" }));
}

#[tokio::test]
async fn start_falls_back_to_next_gpu() {
    let h = gateway(&["A", "B"], Duration::from_secs(5)).await;
    h.provider.exhaust_gpu("A");

    let resp = reqwest::Client::new().post(h.url("/api/pod/start")).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "starting");
    assert_eq!(body["gpu"], "B");
    assert_eq!(h.get(keys::START_STRATEGY).as_deref(), Some("create"));
}

#[tokio::test]
async fn start_with_no_capacity_is_503_with_error() {
    let h = gateway(&["A", "B"], Duration::from_secs(5)).await;
    h.provider.exhaust_gpu("A");
    h.provider.exhaust_gpu("B");

    let resp = reqwest::Client::new().post(h.url("/api/pod/start")).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "no GPU capacity available (tried: A, B)");
    assert_eq!(h.get(keys::POD_ID), None);
}

#[tokio::test]
async fn stop_then_status_reports_stopped_before_provider_confirms() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    let client = reqwest::Client::new();
    let started: Value =
        client.post(h.url("/api/pod/start")).send().await.unwrap().json().await.unwrap();
    let pod_id = started["podId"].as_str().unwrap().to_string();
    h.provider.set_status(&pod_id, DesiredStatus::Running, 30);
    h.provider.defer_stops();

    let stopped: Value =
        client.post(h.url("/api/pod/stop")).send().await.unwrap().json().await.unwrap();
    assert_eq!(stopped["status"], "stopped");

    let status: Value = reqwest::get(h.url("/api/pod/status")).await.unwrap().json().await.unwrap();
    assert_eq!(status["status"], "stopped");
    assert_eq!(h.get(keys::POD_ID), Some(pod_id));
    assert_eq!(h.get(keys::POD_URL), None);
}

#[tokio::test]
async fn pod_routes_do_not_count_as_activity() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    reqwest::get(h.url("/api/pod/status")).await.unwrap();
    assert_eq!(h.get(keys::LAST_ACTIVITY), None);
}
