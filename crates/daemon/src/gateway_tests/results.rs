// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn durable_result_is_served_without_a_pod() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    let src = h._tmp.path().join("result.glb");
    std::fs::write(&src, b"glTF-bytes").unwrap();
    h.results.publish("job1", "result.glb", &src).await.unwrap();

    let resp = reqwest::get(h.url("/api/results/job1/result.glb")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "model/gltf-binary");
    assert_eq!(&resp.bytes().await.unwrap()[..], b"glTF-bytes");
    assert_eq!(h.get(keys::LAST_ACTIVITY), None);
}

#[tokio::test]
async fn missing_result_falls_back_to_pod() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    h.serving_at(&worker_stub().await).await;

    let resp = reqwest::get(h.url("/api/results/job1/preview.png")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let echoed: Value = resp.json().await.unwrap();
    assert_eq!(echoed["uri"], "/api/results/job1/preview.png");
}

#[tokio::test]
async fn missing_result_without_pod_is_503() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;

    let resp = reqwest::get(h.url("/api/results/job1/preview.png")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn path_tricks_are_rejected() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;

    let resp = reqwest::get(h.url("/api/results/job1/..%2Fjobs.json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
