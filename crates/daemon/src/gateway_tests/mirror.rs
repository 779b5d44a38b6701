// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::extract::Path;
use mp_core::{Job, JobId, JobStatus};

use crate::worker::MIRROR_HEADER;

fn finished(id: &str, artifacts: &[&str]) -> Job {
    let mut job = Job::new(JobId::from(id), "/videos/dance.mp4", 1_000);
    job.status = JobStatus::Complete;
    job.progress = 100;
    job.artifacts = artifacts.iter().map(|name| name.to_string()).collect();
    job
}

/// Anything but the mirror's own requests is refused.
fn mirrored(headers: &HeaderMap) -> Result<(), StatusCode> {
    if headers.contains_key(MIRROR_HEADER) {
        Ok(())
    } else {
        Err(StatusCode::BAD_REQUEST)
    }
}

async fn jobs(headers: HeaderMap) -> Result<axum::Json<Vec<Job>>, StatusCode> {
    mirrored(&headers)?;
    let mut running = Job::new(JobId::from("job2"), "/videos/spin.mp4", 2_000);
    running.artifacts = vec!["result.glb".to_string()];
    Ok(axum::Json(vec![running, finished("job1", &["result.glb", "preview.png"])]))
}

async fn result(
    headers: HeaderMap,
    Path((job_id, file)): Path<(String, String)>,
) -> Result<&'static [u8], StatusCode> {
    mirrored(&headers)?;
    match (job_id.as_str(), file.as_str()) {
        ("job1", "result.glb") | ("job2", "result.glb") => Ok(&b"glTF-bytes"[..]),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

/// A pod with one finished job whose preview never got rendered.
async fn pod_with_results() -> String {
    let app = Router::new()
        .route("/api/jobs", get(jobs))
        .route("/api/results/{job_id}/{file}", get(result));
    format!("http://{}", serve(app).await)
}

#[tokio::test]
async fn sync_copies_finished_artifacts_once() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    let pod = pod_with_results().await;
    let mirror = ResultMirror::new(h.results.clone(), reqwest::Client::new());

    assert_eq!(mirror.sync(&pod).await.unwrap(), 1);

    let stored = h.results.find("job1", "result.glb").await.unwrap().unwrap();
    assert_eq!(std::fs::read(stored).unwrap(), b"glTF-bytes");
    assert_eq!(h.results.find("job1", "preview.png").await.unwrap(), None);
    // still running: nothing copied yet
    assert_eq!(h.results.find("job2", "result.glb").await.unwrap(), None);

    assert_eq!(mirror.sync(&pod).await.unwrap(), 0);
}

#[tokio::test]
async fn sync_against_unreachable_pod_fails() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    let mirror = ResultMirror::new(h.results.clone(), reqwest::Client::new());

    assert!(matches!(mirror.sync("http://127.0.0.1:1").await, Err(MirrorError::Http(_))));
}

#[tokio::test]
async fn stop_copies_results_before_the_pod_goes_away() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    h.serving_at(&pod_with_results().await).await;

    let resp = reqwest::Client::new().post(h.url("/api/pod/stop")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.get(keys::POD_URL), None);

    let resp = reqwest::get(h.url("/api/results/job1/result.glb")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&resp.bytes().await.unwrap()[..], b"glTF-bytes");
}
