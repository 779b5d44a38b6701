// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

async fn heartbeat(h: &Harness) -> Value {
    reqwest::get(h.url("/api/heartbeat")).await.unwrap().json().await.unwrap()
}

#[tokio::test]
async fn polling_does_not_count_as_activity() {
    let h = worker("true").await;
    let started = h.clock.epoch_ms();
    h.clock.advance(Duration::from_secs(60));

    let beat = heartbeat(&h).await;
    reqwest::get(h.url("/api/health")).await.unwrap();

    assert_eq!(beat["lastActivity"], started);
    assert_eq!(beat["uptimeSeconds"], 60);
    assert_eq!(h.state.last_activity(), started);
}

#[tokio::test]
async fn result_mirroring_does_not_count_as_activity() {
    let h = worker("true").await;
    let started = h.clock.epoch_ms();
    h.clock.advance(Duration::from_secs(60));

    let resp = reqwest::Client::new()
        .get(h.url("/api/jobs"))
        .header(MIRROR_HEADER, "1")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.state.last_activity(), started);
}

#[tokio::test]
async fn job_requests_stamp_activity() {
    let h = worker("true").await;
    h.clock.advance(Duration::from_secs(60));

    reqwest::get(h.url("/api/jobs")).await.unwrap();

    let beat = heartbeat(&h).await;
    assert_eq!(beat["lastActivity"], h.clock.epoch_ms());
    let at = beat["lastActivityAt"].as_str().unwrap();
    let parsed = chrono::DateTime::parse_from_rfc3339(at).unwrap();
    assert_eq!(parsed.timestamp_millis() as u64, h.clock.epoch_ms());
}

#[tokio::test]
async fn reports_running_and_queued_jobs() {
    let h = worker("sleep 5").await;
    let first = h.submit("/videos/a.mp4").await;
    let second = h.submit("/videos/b.mp4").await;
    h.wait_for(&first.id, JobStatus::Building).await;

    let beat = heartbeat(&h).await;
    assert_eq!(beat["runningJobs"], 1);
    assert_eq!(beat["queuedJobs"], 1);

    h.state.jobs().delete(&second.id).await.unwrap();
    h.state.jobs().delete(&first.id).await.unwrap();
}

#[tokio::test]
async fn health_is_ok() {
    let h = worker("true").await;

    let body: Value = reqwest::get(h.url("/api/health")).await.unwrap().json().await.unwrap();

    assert_eq!(body, json!({ "status": "ok" }));
}
