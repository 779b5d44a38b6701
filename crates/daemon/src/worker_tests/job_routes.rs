// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn submitted_job_completes_and_serves_its_result() {
    let h = worker("true").await;

    let job = h.submit("/videos/dance.mp4").await;
    assert_eq!(job.status, JobStatus::Preprocessing);
    assert_eq!(job.progress, 0);

    let done = h.wait_for(&job.id, JobStatus::Complete).await;
    assert_eq!(done.artifacts, vec!["result.glb"]);

    let resp = reqwest::get(h.url(&format!("/api/results/{}/result.glb", job.id))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "model/gltf-binary");
}

#[tokio::test]
async fn blank_source_is_400() {
    let h = worker("true").await;

    let resp = reqwest::Client::new()
        .post(h.url("/api/jobs"))
        .json(&json!({ "sourceRef": "  " }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "sourceRef must not be empty");
}

#[tokio::test]
async fn malformed_body_is_400_with_json_error() {
    let h = worker("true").await;

    let resp = reqwest::Client::new()
        .post(h.url("/api/jobs"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn get_returns_job_or_404() {
    let h = worker("true").await;
    let job = h.submit("/videos/a.mp4").await;

    let found: Job =
        reqwest::get(h.url(&format!("/api/jobs/{}", job.id))).await.unwrap().json().await.unwrap();
    assert_eq!(found.id, job.id);
    assert_eq!(found.source_ref, "/videos/a.mp4");

    let resp = reqwest::get(h.url("/api/jobs/nosuchjob")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_is_recent_first_and_honours_limit() {
    let h = worker("true").await;
    let first = h.submit("/videos/a.mp4").await;
    h.clock.advance(Duration::from_secs(1));
    let second = h.submit("/videos/b.mp4").await;

    let all: Vec<Job> = reqwest::get(h.url("/api/jobs")).await.unwrap().json().await.unwrap();
    let ids: Vec<_> = all.iter().map(|j| j.id.clone()).collect();
    assert_eq!(ids, vec![second.id.clone(), first.id]);

    let one: Vec<Job> =
        reqwest::get(h.url("/api/jobs?limit=1")).await.unwrap().json().await.unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].id, second.id);
}

#[tokio::test]
async fn bad_limit_is_400() {
    let h = worker("true").await;

    let resp = reqwest::get(h.url("/api/jobs?limit=lots")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_removes_job_and_its_results() {
    let h = worker("true").await;
    let job = h.submit("/videos/a.mp4").await;
    h.wait_for(&job.id, JobStatus::Complete).await;
    let client = reqwest::Client::new();

    let resp = client.delete(h.url(&format!("/api/jobs/{}", job.id))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = reqwest::get(h.url(&format!("/api/jobs/{}", job.id))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = reqwest::get(h.url(&format!("/api/results/{}/result.glb", job.id))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client.delete(h.url(&format!("/api/jobs/{}", job.id))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn in_flight_artifact_is_read_from_work_dir() {
    let h = worker("sleep 5").await;
    let job = h.submit("/videos/a.mp4").await;
    h.wait_for(&job.id, JobStatus::Building).await;
    let work_dir = h.state.jobs().work_dir(&job.id);
    std::fs::write(work_dir.join("preview.png"), b"png").unwrap();

    let resp = reqwest::get(h.url(&format!("/api/results/{}/preview.png", job.id))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&resp.bytes().await.unwrap()[..], b"png");

    // Only pipeline artifacts are exposed, not arbitrary work files.
    std::fs::write(work_dir.join("notes.txt"), b"x").unwrap();
    let resp = reqwest::get(h.url(&format!("/api/results/{}/notes.txt", job.id))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    h.state.jobs().delete(&job.id).await.unwrap();
}

#[tokio::test]
async fn responses_carry_permissive_cors() {
    let h = worker("true").await;

    let resp = reqwest::Client::new()
        .get(h.url("/api/jobs"))
        .header("origin", "https://app.example")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}
