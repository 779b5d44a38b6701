// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::http::StatusCode;
use mp_core::{FakeClock, Job, JobId, JobStatus, Stage};
use mp_engine::{PipelineConfig, StageSpec, StepSpec};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tempfile::TempDir;

mod events;
mod heartbeat;
mod job_routes;

struct Harness {
    addr: SocketAddr,
    state: Arc<WorkerState<FakeClock>>,
    clock: FakeClock,
    _tmp: TempDir,
}

/// One build stage running `command` then producing the primary artifact.
fn pipeline(tmp: &TempDir, command: &str) -> PipelineConfig {
    let stages = vec![StageSpec {
        stage: Stage::Build,
        steps: vec![StepSpec::new(
            "build",
            format!("{command}\ntouch result.glb"),
            &["result.glb"],
        )],
        timeout: Duration::from_secs(10),
    }];
    PipelineConfig::with_stages(stages, tmp.path())
}

async fn worker(command: &str) -> Harness {
    let tmp = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let results = ResultStore::new(tmp.path().join("results"));
    let jobs = JobService::open(
        JobRepository::new(tmp.path().join("jobs.json")),
        EventBroadcaster::default(),
        JobServiceConfig {
            work_root: tmp.path().join("work"),
            results: results.clone(),
            logger: JobLogger::new(tmp.path().join("logs")),
        },
        clock.clone(),
    )
    .unwrap();
    let runner =
        JobRunner::new(jobs, JobQueue::new(1), DependencyGate::open(), pipeline(&tmp, command));
    let state = Arc::new(WorkerState::new(runner, results, clock.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Harness { addr, state, clock, _tmp: tmp }
}

impl Harness {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn submit(&self, source: &str) -> Job {
        let resp = reqwest::Client::new()
            .post(self.url("/api/jobs"))
            .json(&json!({ "sourceRef": source }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.unwrap()
    }

    async fn wait_for(&self, id: &JobId, status: JobStatus) -> Job {
        for _ in 0..200 {
            if let Some(job) = self.state.jobs().get(id) {
                if job.status == status {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {id} never reached {status}");
    }
}
