// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::broadcast::EventBroadcaster;
use crate::job_logger::JobLogger;
use crate::jobs::JobServiceConfig;
use crate::pipeline::{StageSpec, StepSpec};
use axum::{http::StatusCode, routing::get, Json, Router};
use mp_core::{FakeClock, JobStatus, Stage};
use mp_storage::{JobRepository, ResultStore};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn jobs(dir: &TempDir) -> JobService<FakeClock> {
    JobService::open(
        JobRepository::new(dir.path().join("jobs.json")),
        EventBroadcaster::default(),
        JobServiceConfig {
            work_root: dir.path().join("work"),
            results: ResultStore::new(dir.path().join("results")),
            logger: JobLogger::new(dir.path().join("logs")),
        },
        FakeClock::new(),
    )
    .unwrap()
}

/// One-stage pipeline whose only step runs `command` and builds the artifact.
fn pipeline(dir: &TempDir, command: &str) -> PipelineConfig {
    let stages = vec![StageSpec {
        stage: Stage::Build,
        steps: vec![StepSpec::new(
            "build",
            format!("{command}\ntouch result.glb"),
            &["result.glb"],
        )],
        timeout: Duration::from_secs(10),
    }];
    PipelineConfig::with_stages(stages, dir.path())
}

async fn wait_for_status(jobs: &JobService<FakeClock>, id: &JobId, status: JobStatus) -> Job {
    for _ in 0..200 {
        if let Some(job) = jobs.get(id) {
            if job.status == status {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {id} never reached {status}: {:?}", jobs.get(id));
}

#[tokio::test]
async fn submitted_job_runs_to_completion() {
    let dir = TempDir::new().unwrap();
    let runner = JobRunner::new(
        jobs(&dir),
        JobQueue::new(1),
        DependencyGate::open(),
        pipeline(&dir, "true"),
    );

    let job = runner.submit("/videos/a.mp4").unwrap();
    assert_eq!(job.status, JobStatus::Preprocessing);

    let done = wait_for_status(runner.jobs(), &job.id, JobStatus::Complete).await;
    assert_eq!(done.artifacts, vec!["result.glb"]);
}

#[tokio::test]
async fn single_slot_runs_jobs_one_at_a_time() {
    let dir = TempDir::new().unwrap();
    let runner = JobRunner::new(
        jobs(&dir),
        JobQueue::new(1),
        DependencyGate::open(),
        pipeline(&dir, "sleep 0.3"),
    );

    let first = runner.submit("/videos/a.mp4").unwrap();
    let second = runner.submit("/videos/b.mp4").unwrap();
    wait_for_status(runner.jobs(), &first.id, JobStatus::Building).await;

    assert_eq!(runner.queue().stats().running, 1);
    assert_eq!(runner.jobs().get(&second.id).unwrap().status, JobStatus::Preprocessing);

    wait_for_status(runner.jobs(), &second.id, JobStatus::Complete).await;
    assert_eq!(runner.jobs().get(&first.id).unwrap().status, JobStatus::Complete);
}

#[tokio::test]
async fn job_waits_at_first_stage_while_dependency_is_down() {
    let healthy = Arc::new(AtomicBool::new(false));
    let app = {
        let healthy = healthy.clone();
        Router::new().route(
            "/api/v1/health",
            get(move || {
                let healthy = healthy.load(Ordering::SeqCst);
                async move {
                    if healthy {
                        (StatusCode::OK, Json(json!({ "status": "ok" })))
                    } else {
                        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "loading" })))
                    }
                }
            }),
        )
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let dir = TempDir::new().unwrap();
    let gate = DependencyGate::new(&format!("http://{addr}"), Duration::from_millis(20)).unwrap();
    let runner = JobRunner::new(jobs(&dir), JobQueue::new(1), gate, pipeline(&dir, "true"));

    let job = runner.submit("/videos/a.mp4").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let waiting = runner.jobs().get(&job.id).unwrap();
    assert_eq!(waiting.status, JobStatus::Preprocessing);
    assert_eq!(waiting.progress, 0);

    healthy.store(true, Ordering::SeqCst);
    wait_for_status(runner.jobs(), &job.id, JobStatus::Complete).await;
}

#[tokio::test]
async fn deleting_a_queued_job_frees_its_place() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("ran");
    let command = format!("sleep 0.3\necho ran >> {}", marker.display());
    let runner = JobRunner::new(
        jobs(&dir),
        JobQueue::new(1),
        DependencyGate::open(),
        pipeline(&dir, &command),
    );

    let first = runner.submit("/videos/a.mp4").unwrap();
    let second = runner.submit("/videos/b.mp4").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runner.queue().stats().queued, 1);

    runner.jobs().delete(&second.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runner.queue().stats().queued, 0);

    wait_for_status(runner.jobs(), &first.id, JobStatus::Complete).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "ran\n");
}
