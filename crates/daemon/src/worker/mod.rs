// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-pod worker: job API, live event stream, heartbeat and results.

mod events;
mod routes;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use mp_core::{Clock, SystemClock};
use mp_engine::{
    DependencyGate, EventBroadcaster, JobLogger, JobQueue, JobRunner, JobService, JobServiceConfig,
};
use mp_storage::{JobRepository, ResultStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::WorkerConfig;
use crate::lifecycle::{shutdown_signal, PidLock, StartupError};

/// How often a gated job re-probes the preprocessor.
const GATE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Paths that must not count as user activity: the gateway and load
/// balancers poll them.
const PASSIVE_PATHS: [&str; 2] = ["/api/heartbeat", "/api/health"];

/// Set by the gateway when it copies results off the pod. Such requests
/// are not user activity either.
pub const MIRROR_HEADER: &str = "x-motionpod-mirror";

pub struct WorkerState<C: Clock> {
    pub runner: JobRunner<C>,
    pub results: ResultStore,
    pub clock: C,
    started: Instant,
    /// Epoch ms of the last non-passive request
    last_activity: AtomicU64,
}

impl<C: Clock> WorkerState<C> {
    pub fn new(runner: JobRunner<C>, results: ResultStore, clock: C) -> Self {
        let now_ms = clock.epoch_ms();
        Self { started: clock.now(), runner, results, clock, last_activity: AtomicU64::new(now_ms) }
    }

    pub fn jobs(&self) -> &JobService<C> {
        self.runner.jobs()
    }

    pub fn last_activity(&self) -> u64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    pub fn touch(&self) {
        self.last_activity.fetch_max(self.clock.epoch_ms(), Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started)
    }
}

async fn record_activity<C: Clock>(
    State(state): State<Arc<WorkerState<C>>>,
    req: Request,
    next: Next,
) -> Response {
    let passive = PASSIVE_PATHS.contains(&req.uri().path())
        || req.headers().contains_key(MIRROR_HEADER);
    if !passive {
        state.touch();
    }
    next.run(req).await
}

pub fn router<C: Clock>(state: Arc<WorkerState<C>>) -> Router {
    Router::new()
        .route("/api/jobs", get(routes::list::<C>).post(routes::submit::<C>))
        .route("/api/jobs/events", get(events::stream::<C>))
        .route("/api/jobs/{id}", get(routes::get_job::<C>).delete(routes::delete::<C>))
        .route("/api/heartbeat", get(routes::heartbeat::<C>))
        .route("/api/health", get(routes::health))
        .route("/api/results/{job_id}/{file}", get(routes::result::<C>))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), record_activity::<C>))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the worker until SIGINT/SIGTERM.
pub async fn run(config: WorkerConfig) -> Result<(), StartupError> {
    let _lock = PidLock::acquire(&config.state_dir, "mp-worker")?;

    let results = ResultStore::new(&config.results_dir);
    let jobs = JobService::open(
        JobRepository::new(&config.jobs_path),
        EventBroadcaster::default(),
        JobServiceConfig {
            work_root: config.work_root.clone(),
            results: results.clone(),
            logger: JobLogger::new(&config.logs_dir),
        },
        SystemClock,
    )?;

    let gate = match &config.preprocessor_url {
        Some(url) => DependencyGate::new(url, GATE_POLL_INTERVAL)?,
        None => DependencyGate::open(),
    };
    let queue = JobQueue::new(config.slots);
    let runner = JobRunner::new(jobs, queue.clone(), gate, config.pipeline());
    let state = Arc::new(WorkerState::new(runner, results, SystemClock));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|e| StartupError::BindFailed(config.listen, e))?;
    info!(
        addr = %config.listen,
        slots = queue.capacity(),
        preprocessor = config.preprocessor_url.as_deref().unwrap_or("none"),
        "worker listening"
    );

    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;

    queue.close();
    info!("worker stopped");
    Ok(())
}

#[cfg(test)]
#[path = "../worker_tests/mod.rs"]
mod tests;
