// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn booting_pod_is_503_but_still_stamps_activity() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    h.pods.record_start("pod1", StartStrategy::Create, h.clock.epoch_ms()).await.unwrap();
    h.clock.advance(Duration::from_secs(90));

    let resp = reqwest::get(h.url("/api/jobs")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("not running"));
    assert_eq!(h.get(keys::LAST_ACTIVITY), Some(h.clock.epoch_ms().to_string()));
}

#[tokio::test]
async fn no_pod_is_503_and_leaves_directory_empty() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;

    let resp = reqwest::get(h.url("/api/jobs")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(h.dir.entries().is_empty());
}

#[tokio::test]
async fn forwards_method_path_query_body_and_headers() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    h.serving_at(&worker_stub().await).await;

    let resp = reqwest::Client::new()
        .post(h.url("/api/jobs?limit=5"))
        .header("origin", "https://ui.test")
        .header("x-client", "ui")
        .header("keep-alive", "timeout=5")
        .header(crate::worker::MIRROR_HEADER, "1")
        .body(r#"{"sourceRef":"/videos/a.mp4"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers()["x-upstream"], "worker");
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    let echoed: Value = resp.json().await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["uri"], "/api/jobs?limit=5");
    assert_eq!(echoed["body"], r#"{"sourceRef":"/videos/a.mp4"}"#);
    assert_eq!(echoed["headers"]["x-client"], "ui");
    assert!(echoed["headers"].get("keep-alive").is_none());
    assert!(echoed["headers"].get(crate::worker::MIRROR_HEADER).is_none());
    assert!(h.get(keys::LAST_ACTIVITY).is_some());
}

#[tokio::test]
async fn unreachable_pod_is_502() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    h.serving_at(&dead).await;

    let resp = reqwest::get(h.url("/api/jobs")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert!(resp.json::<Value>().await.unwrap()["error"].is_string());
}

#[tokio::test]
async fn slow_pod_is_504() {
    let h = gateway(&["A"], Duration::from_millis(200)).await;
    let slow = serve(Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "late"
    }))
    .await;
    h.serving_at(&format!("http://{slow}")).await;

    let started = std::time::Instant::now();
    let resp = reqwest::get(h.url("/api/jobs")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn preflight_is_answered_locally() {
    let h = gateway(&["A"], Duration::from_secs(5)).await;

    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, h.url("/api/jobs"))
        .header("origin", "https://ui.test")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(h.get(keys::LAST_ACTIVITY), None);
}

#[test]
fn hop_by_hop_headers_are_removed() {
    let mut headers = HeaderMap::new();
    headers.insert("connection", "x-trace, keep-alive".parse().unwrap());
    headers.insert("x-trace", "1".parse().unwrap());
    headers.insert("transfer-encoding", "chunked".parse().unwrap());
    headers.insert("content-type", "application/json".parse().unwrap());

    super::super::proxy::strip_hop_by_hop(&mut headers);

    assert_eq!(headers.len(), 1);
    assert_eq!(headers["content-type"], "application/json");
}
