// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RunPod GraphQL client.

use super::{CreatePod, PodProvider, ProviderError};
use async_trait::async_trait;
use mp_core::{DesiredStatus, PodRecord};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Substrings (lowercased) the provider uses when a GPU type has no free machines.
const CAPACITY_MARKERS: [&str; 4] = [
    "no longer any instances available",
    "not enough free gpus",
    "no available",
    "capacity",
];

const POD_QUERY: &str = "query Pod($input: PodFilter!) { \
    pod(input: $input) { id desiredStatus machine { gpuDisplayName } \
    runtime { uptimeInSeconds } } }";

const CREATE_MUTATION: &str = "mutation Create($input: PodFindAndDeployOnDemandInput) { \
    podFindAndDeployOnDemand(input: $input) { id } }";

const RESUME_MUTATION: &str = "mutation Resume($input: PodResumeInput!) { \
    podResume(input: $input) { id desiredStatus } }";

const STOP_MUTATION: &str = "mutation Stop($input: PodStopInput!) { \
    podStop(input: $input) { id desiredStatus } }";

const TERMINATE_MUTATION: &str = "mutation Terminate($input: PodTerminateInput!) { \
    podTerminate(input: $input) }";

#[derive(Clone)]
pub struct RunPodProvider {
    client: Client,
    url: String,
    api_key: String,
    port: u16,
}

impl RunPodProvider {
    /// `port` is the container port whose proxy URL becomes the pod endpoint.
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        port: u16,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, url: url.into(), api_key: api_key.into(), port })
    }

    /// Public HTTPS endpoint the provider proxies to the pod's port.
    pub fn endpoint(&self, pod_id: &str) -> String {
        format!("https://{pod_id}-{}.proxy.runpod.net", self.port)
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        input: Value,
    ) -> Result<T, GraphqlFailure> {
        let body = json!({ "query": query, "variables": { "input": input } });
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GraphqlFailure::Transport(e.into()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| GraphqlFailure::Transport(e.into()))?;
        tracing::debug!(%status, body = %truncate(&text, 512), "provider response");

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                GraphqlFailure::Transport(ProviderError::Decode(format!(
                    "{e}: {}",
                    truncate(&text, 256)
                )))
            } else {
                GraphqlFailure::Message(format!("HTTP {status}: {}", truncate(&text, 256)))
            }
        })?;

        if let Some(error) = envelope.errors.into_iter().next() {
            return Err(GraphqlFailure::Message(error.message));
        }
        if !status.is_success() {
            return Err(GraphqlFailure::Message(format!("HTTP {status}")));
        }
        envelope
            .data
            .ok_or_else(|| GraphqlFailure::Transport(ProviderError::Decode("missing data".into())))
    }
}

/// A GraphQL call fails either below the protocol (transport, decode) or
/// with a provider message that the caller classifies.
enum GraphqlFailure {
    Transport(ProviderError),
    Message(String),
}

impl GraphqlFailure {
    fn into_api(self) -> ProviderError {
        match self {
            GraphqlFailure::Transport(e) => e,
            GraphqlFailure::Message(m) => ProviderError::Api(m),
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct PodData {
    pod: Option<RawPod>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPod {
    id: String,
    desired_status: Option<String>,
    machine: Option<RawMachine>,
    runtime: Option<RawRuntime>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMachine {
    gpu_display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRuntime {
    uptime_in_seconds: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    pod_find_and_deploy_on_demand: Option<IdOnly>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResumeData {
    pod_resume: Option<IdOnly>,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

fn is_capacity_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    CAPACITY_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_not_found_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not found") || lower.contains("does not exist")
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl PodProvider for RunPodProvider {
    async fn query(&self, pod_id: &str) -> Result<Option<PodRecord>, ProviderError> {
        let data: PodData = match self.graphql(POD_QUERY, json!({ "podId": pod_id })).await {
            Ok(data) => data,
            Err(GraphqlFailure::Message(m)) if is_not_found_message(&m) => return Ok(None),
            Err(e) => return Err(e.into_api()),
        };

        Ok(data.pod.map(|raw| {
            let desired_status = raw
                .desired_status
                .as_deref()
                .map(DesiredStatus::parse)
                .unwrap_or(DesiredStatus::Unknown);
            let endpoint = Some(self.endpoint(&raw.id));
            PodRecord {
                desired_status,
                uptime_secs: raw.runtime.and_then(|r| r.uptime_in_seconds).unwrap_or(0),
                gpu: raw.machine.and_then(|m| m.gpu_display_name),
                endpoint,
                id: raw.id,
            }
        }))
    }

    async fn create(&self, spec: &CreatePod) -> Result<String, ProviderError> {
        let env: Vec<Value> =
            spec.env.iter().map(|(k, v)| json!({ "key": k, "value": v })).collect();
        let input = json!({
            "cloudType": "ALL",
            "gpuCount": 1,
            "gpuTypeId": spec.gpu_type,
            "name": spec.name,
            "imageName": spec.image,
            "containerDiskInGb": spec.disk_gb,
            "volumeInGb": spec.volume_gb,
            "volumeMountPath": "/workspace",
            "ports": spec.ports,
            "env": env,
        });

        let data: CreateData = match self.graphql(CREATE_MUTATION, input).await {
            Ok(data) => data,
            Err(GraphqlFailure::Message(m)) if is_capacity_message(&m) => {
                return Err(ProviderError::Capacity { gpu: spec.gpu_type.clone(), message: m });
            }
            Err(e) => return Err(e.into_api()),
        };

        // The provider answers a capacity miss with a null pod as often as with an error.
        data.pod_find_and_deploy_on_demand.map(|p| p.id).ok_or_else(|| ProviderError::Capacity {
            gpu: spec.gpu_type.clone(),
            message: "no pod returned".to_string(),
        })
    }

    async fn resume(&self, pod_id: &str) -> Result<String, ProviderError> {
        let data: ResumeData = self
            .graphql(RESUME_MUTATION, json!({ "podId": pod_id, "gpuCount": 1 }))
            .await
            .map_err(GraphqlFailure::into_api)?;
        data.pod_resume
            .map(|p| p.id)
            .ok_or_else(|| ProviderError::Api(format!("resume returned no pod for {pod_id}")))
    }

    async fn stop(&self, pod_id: &str) -> Result<(), ProviderError> {
        self.graphql::<Value>(STOP_MUTATION, json!({ "podId": pod_id }))
            .await
            .map_err(GraphqlFailure::into_api)?;
        Ok(())
    }

    async fn terminate(&self, pod_id: &str) -> Result<(), ProviderError> {
        self.graphql::<Value>(TERMINATE_MUTATION, json!({ "podId": pod_id }))
            .await
            .map_err(GraphqlFailure::into_api)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "runpod_tests.rs"]
mod tests;
