// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: a gateway wired to a fake provider, and a worker whose
//! pipeline stages only create their declared outputs.

pub use mp_core::{DesiredStatus, FakeClock, Job, JobStatus};
pub use mp_engine::ReapOutcome;
pub use reqwest::StatusCode;
pub use serde_json::{json, Value};
pub use std::time::Duration;

use mp_adapters::{FakeProvider, PodTemplate};
use mp_core::{GpuPriorityList, Stage, SystemClock};
use mp_daemon::{gateway, worker, GatewayState, WorkerState};
use mp_engine::{
    CoordinatorConfig, DependencyGate, EventBroadcaster, IdleReaper, JobLogger, JobQueue,
    JobRunner, JobService, JobServiceConfig, PipelineConfig,
};
use mp_storage::{JobRepository, MemoryDirectory, PodDirectory, ResultStore};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;

/// Upper bound for polling a job to a terminal state.
pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Stand-in commands: each stage just creates what it declares.
const STAGE_COMMANDS: [(Stage, &str); 6] = [
    (Stage::Preprocess, "touch input.mp4"),
    (Stage::Extract, "mkdir -p mocap"),
    (Stage::Convert, "touch motion.npz"),
    (Stage::Build, "touch result.glb"),
    (Stage::Render, "touch overlay.mp4"),
    (Stage::Composite, "touch comparison.mp4 preview.png"),
];

async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A gateway and a worker, each with its own result store as on separate
/// machines.
pub struct Stack {
    pub gateway: SocketAddr,
    pub worker: SocketAddr,
    pub provider: FakeProvider,
    pub pods: PodDirectory,
    pub clock: FakeClock,
    pub reaper: IdleReaper<FakeProvider, FakeClock>,
    pub http: reqwest::Client,
    _state: TempDir,
}

impl Stack {
    pub async fn start(gpus: &[&str]) -> Self {
        let state = TempDir::new().unwrap();
        let worker_results = ResultStore::new(state.path().join("pod/results"));
        let worker = serve(worker::router(Arc::new(worker_state(&state, &worker_results)))).await;

        let provider = FakeProvider::new();
        let pods = PodDirectory::new(Arc::new(MemoryDirectory::new()));
        let clock = FakeClock::new();
        let gateway_state = GatewayState::new(
            provider.clone(),
            pods.clone(),
            ResultStore::new(state.path().join("gateway/results")),
            clock.clone(),
            coordinator_config(gpus),
            Duration::from_secs(5),
        )
        .unwrap();
        let gateway = serve(gateway::router(Arc::new(gateway_state))).await;
        let reaper = IdleReaper::new(provider.clone(), pods.clone(), clock.clone(), IDLE_TIMEOUT);

        Self {
            gateway,
            worker,
            provider,
            pods,
            clock,
            reaper,
            http: reqwest::Client::new(),
            _state: state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.gateway, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.http.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.http.post(self.url(path)).json(&body).send().await.unwrap()
    }

    pub async fn pod(&self, action: &str) -> Value {
        let resp = match action {
            "status" => self.get("/api/pod/status").await,
            _ => self.http.post(self.url(&format!("/api/pod/{action}"))).send().await.unwrap(),
        };
        assert_eq!(resp.status(), StatusCode::OK, "pod {action}");
        resp.json().await.unwrap()
    }

    /// Finish booting `pod_id`: the provider reports it serving on the
    /// local worker's address.
    pub fn boot(&self, pod_id: &str) {
        let mut record = self.provider.pod(pod_id).unwrap();
        record.desired_status = DesiredStatus::Running;
        record.uptime_secs = 30;
        record.endpoint = Some(format!("http://{}", self.worker));
        self.provider.insert_pod(record);
    }

    /// Start a pod and bring it to running through the gateway.
    pub async fn running_pod(&self) -> String {
        let started = self.pod("start").await;
        let pod_id = started["podId"].as_str().unwrap().to_string();
        self.boot(&pod_id);
        assert_eq!(self.pod("status").await["status"], "running");
        pod_id
    }

    pub async fn wait_for_terminal(&self, id: &str) -> Job {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
        loop {
            let job: Job = self.get(&format!("/api/jobs/{id}")).await.json().await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            assert!(tokio::time::Instant::now() < deadline, "job {id} still {}", job.status);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

fn coordinator_config(gpus: &[&str]) -> CoordinatorConfig {
    CoordinatorConfig {
        gpus: GpuPriorityList::new(gpus.iter().copied()),
        template: PodTemplate {
            name: "motionpod-worker".into(),
            image: "motionpod/worker:latest".into(),
            disk_gb: 40,
            volume_gb: 50,
            port: 8000,
            env: BTreeMap::new(),
        },
        resume_stuck_after: Duration::from_secs(120),
        create_stuck_after: Duration::from_secs(600),
    }
}

fn worker_state(state: &TempDir, results: &ResultStore) -> WorkerState<SystemClock> {
    let jobs = JobService::open(
        JobRepository::new(state.path().join("jobs.json")),
        EventBroadcaster::default(),
        JobServiceConfig {
            work_root: state.path().join("work"),
            results: results.clone(),
            logger: JobLogger::new(state.path().join("logs")),
        },
        SystemClock,
    )
    .unwrap();

    let mut pipeline = PipelineConfig::new(state.path().join("tools"), None);
    for (stage, command) in STAGE_COMMANDS {
        pipeline.override_stage(stage, command);
    }
    let runner = JobRunner::new(jobs, JobQueue::new(1), DependencyGate::open(), pipeline);
    WorkerState::new(runner, results.clone(), SystemClock)
}
