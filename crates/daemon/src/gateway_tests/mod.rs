// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use mp_adapters::{FakeProvider, PodTemplate};
use mp_core::{FakeClock, GpuPriorityList, StartStrategy};
use mp_storage::{keys, MemoryDirectory};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tempfile::TempDir;

mod mirror;
mod pod_routes;
mod proxy;
mod results;

struct Harness {
    addr: SocketAddr,
    provider: FakeProvider,
    dir: MemoryDirectory,
    pods: PodDirectory,
    clock: FakeClock,
    results: ResultStore,
    _tmp: TempDir,
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

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn gateway(gpus: &[&str], proxy_timeout: Duration) -> Harness {
    let tmp = TempDir::new().unwrap();
    let provider = FakeProvider::new();
    let dir = MemoryDirectory::new();
    let pods = PodDirectory::new(Arc::new(dir.clone()));
    let clock = FakeClock::new();
    let results = ResultStore::new(tmp.path().join("results"));
    let state = GatewayState::new(
        provider.clone(),
        pods.clone(),
        results.clone(),
        clock.clone(),
        coordinator_config(gpus),
        proxy_timeout,
    )
    .unwrap();
    let addr = serve(router(Arc::new(state))).await;
    Harness { addr, provider, dir, pods, clock, results, _tmp: tmp }
}

impl Harness {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Point the directory at a serving pod.
    async fn serving_at(&self, pod_url: &str) {
        self.pods.record_start("pod1", StartStrategy::Create, self.clock.epoch_ms()).await.unwrap();
        self.pods.record_serving(Some(pod_url)).await.unwrap();
    }

    fn get(&self, key: &str) -> Option<String> {
        self.dir.entries().get(key).cloned()
    }
}

/// Echoes what it received as JSON, so tests can see what was forwarded.
async fn echo(req: Request) -> (StatusCode, HeaderMap, axum::Json<Value>) {
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let headers: BTreeMap<String, String> = parts
        .headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let mut out = HeaderMap::new();
    out.insert("x-upstream", "worker".parse().unwrap());
    out.insert("access-control-allow-origin", "https://elsewhere.test".parse().unwrap());
    (
        StatusCode::CREATED,
        out,
        axum::Json(json!({
            "method": parts.method.as_str(),
            "uri": parts.uri.to_string(),
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
        })),
    )
}

async fn worker_stub() -> String {
    format!("http://{}", serve(Router::new().fallback(echo)).await)
}
