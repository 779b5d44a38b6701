// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A full user session through the gateway: start the pod, run a job,
//! fetch its results, stop the pod, fetch them again.

use crate::prelude::*;
use futures_util::StreamExt;

#[tokio::test]
async fn job_runs_through_gateway_and_results_outlive_the_pod() {
    let stack = Stack::start(&["NVIDIA GeForce RTX 4090"]).await;
    stack.running_pod().await;

    let resp = stack.post("/api/jobs", json!({ "sourceRef": "/videos/dance.mp4" })).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let job: Job = resp.json().await.unwrap();

    let done = stack.wait_for_terminal(job.id.as_str()).await;
    assert_eq!(done.status, JobStatus::Complete, "error: {:?}", done.error);
    assert_eq!(done.progress, 100);
    assert!(done.warnings.is_empty());
    assert_eq!(done.artifacts, ["result.glb", "overlay.mp4", "comparison.mp4", "preview.png"]);

    let stopped = stack.pod("stop").await;
    assert_eq!(stopped["status"], "stopped");

    // Copied off the pod before it stopped; served with no pod behind the gateway.
    let resp = stack.get(&format!("/api/results/{}/result.glb", job.id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "model/gltf-binary");
    for name in &done.artifacts {
        let resp = stack.get(&format!("/api/results/{}/{name}", job.id)).await;
        assert_eq!(resp.status(), StatusCode::OK, "{name}");
    }

    // The job API itself needs the pod.
    let resp = stack.get("/api/jobs").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn job_api_without_a_pod_is_503() {
    let stack = Stack::start(&["NVIDIA GeForce RTX 4090"]).await;

    let resp = stack.post("/api/jobs", json!({ "sourceRef": "/videos/dance.mp4" })).await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn worker_errors_pass_through_the_proxy() {
    let stack = Stack::start(&["NVIDIA GeForce RTX 4090"]).await;
    stack.running_pod().await;

    let resp = stack.post("/api/jobs", json!({ "sourceRef": "" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = stack.get("/api/jobs/nosuchjob").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn event_stream_is_relayed_live() {
    let stack = Stack::start(&["NVIDIA GeForce RTX 4090"]).await;
    stack.running_pod().await;

    let resp = stack.get("/api/jobs/events").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let mut stream = resp.bytes_stream();
    let mut seen = String::new();
    let mut submitted = false;

    // Snapshot arrives before any job exists; the created event must follow
    // without the stream ever closing.
    while !seen.contains("event: created") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for events")
            .expect("stream ended")
            .unwrap();
        seen.push_str(&String::from_utf8_lossy(&chunk));
        if seen.contains("event: snapshot") && !submitted {
            submitted = true;
            stack.post("/api/jobs", json!({ "sourceRef": "/videos/a.mp4" })).await;
        }
    }
    assert!(seen.find("event: snapshot") < seen.find("event: created"));
}
