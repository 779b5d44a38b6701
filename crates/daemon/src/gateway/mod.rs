// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The always-on gateway: pod lifecycle routes, the idle reaper, the
//! activity proxy to the worker, and the durable result front door.

mod mirror;
mod pod;
mod proxy;
mod results;

pub use mirror::{MirrorError, ResultMirror};

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use mp_adapters::{PodProvider, RunPodProvider};
use mp_core::{Clock, SystemClock};
use mp_engine::{CoordinatorConfig, IdleReaper, PodCoordinator};
use mp_storage::{FileDirectory, PodDirectory, ResultStore};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::GatewayConfig;
use crate::lifecycle::{shutdown_signal, PidLock, StartupError};

pub struct GatewayState<P: PodProvider, C: Clock> {
    pub coordinator: PodCoordinator<P, C>,
    pub results: ResultStore,
    pub mirror: ResultMirror,
    pub clock: C,
    /// Client for forwarded requests. No overall timeout: only the wait
    /// for response headers is bounded, so long streams pass through.
    pub client: reqwest::Client,
    pub proxy_timeout: Duration,
}

impl<P: PodProvider, C: Clock> GatewayState<P, C> {
    pub fn new(
        provider: P,
        pods: PodDirectory,
        results: ResultStore,
        clock: C,
        coordinator: CoordinatorConfig,
        proxy_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().connect_timeout(proxy_timeout).build()?;
        Ok(Self {
            coordinator: PodCoordinator::new(provider, pods, clock.clone(), coordinator),
            mirror: ResultMirror::new(results.clone(), client.clone()),
            results,
            clock,
            client,
            proxy_timeout,
        })
    }

    pub fn pods(&self) -> &PodDirectory {
        self.coordinator.pods()
    }
}

/// Pod routes are answered here; everything else is forwarded to the pod.
pub fn router<P: PodProvider, C: Clock>(state: Arc<GatewayState<P, C>>) -> Router {
    Router::new()
        .route("/api/pod/start", post(pod::start::<P, C>))
        .route("/api/pod/status", get(pod::status::<P, C>))
        .route("/api/pod/stop", post(pod::stop::<P, C>))
        .route("/api/results/{job_id}/{file}", get(results::fetch::<P, C>))
        .fallback(proxy::forward::<P, C>)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    let _lock = PidLock::acquire(&config.state_dir, "mp-gateway")?;

    let provider = RunPodProvider::new(
        &config.provider_url,
        &config.provider_api_key,
        config.coordinator.template.port,
    )?;
    let pods = PodDirectory::new(Arc::new(FileDirectory::new(&config.directory_path)));
    let state = Arc::new(GatewayState::new(
        provider.clone(),
        pods.clone(),
        ResultStore::new(&config.results_dir),
        SystemClock,
        config.coordinator.clone(),
        config.proxy_timeout,
    )?);

    let cancel = CancellationToken::new();
    let mirror =
        state.mirror.clone().spawn(pods.clone(), config.result_sync_interval, cancel.clone());
    let reaper = IdleReaper::new(provider, pods, SystemClock, config.idle_timeout)
        .spawn(config.reaper_interval, cancel.clone());

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|e| StartupError::BindFailed(config.listen, e))?;
    info!(
        addr = %config.listen,
        gpus = config.coordinator.gpus.len(),
        idle_timeout_secs = config.idle_timeout.as_secs(),
        "gateway listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    let _ = reaper.await;
    let _ = mirror.await;
    info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
#[path = "../gateway_tests/mod.rs"]
mod tests;
