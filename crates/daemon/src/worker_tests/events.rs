// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use futures_util::StreamExt;

/// Reads SSE frames off a live response.
struct EventReader {
    stream: futures_util::stream::BoxStream<'static, reqwest::Result<axum::body::Bytes>>,
    buf: String,
}

impl EventReader {
    async fn connect(h: &Harness) -> Self {
        let resp = reqwest::get(h.url("/api/jobs/events")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()["content-type"].to_str().unwrap().starts_with("text/event-stream"));
        Self { stream: resp.bytes_stream().boxed(), buf: String::new() }
    }

    /// Next `(event name, data)` pair, skipping keep-alive comments.
    async fn next(&mut self) -> (String, Value) {
        loop {
            if let Some(end) = self.buf.find("\n\n") {
                let frame: String = self.buf.drain(..end + 2).collect();
                let mut name = None;
                let mut data = None;
                for line in frame.lines() {
                    if let Some(v) = line.strip_prefix("event:") {
                        name = Some(v.trim().to_string());
                    } else if let Some(v) = line.strip_prefix("data:") {
                        data = Some(serde_json::from_str(v.trim()).unwrap());
                    }
                }
                if let (Some(name), Some(data)) = (name, data) {
                    return (name, data);
                }
                continue;
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("timed out waiting for event")
                .expect("event stream ended")
                .unwrap();
            self.buf.push_str(&String::from_utf8_lossy(&chunk));
        }
    }
}

#[tokio::test]
async fn observer_gets_snapshot_then_live_events() {
    let h = worker("true").await;
    let existing = h.submit("/videos/a.mp4").await;
    h.wait_for(&existing.id, JobStatus::Complete).await;

    let mut events = EventReader::connect(&h).await;
    let (name, snapshot) = events.next().await;
    assert_eq!(name, "snapshot");
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["jobs"][0]["id"], existing.id.as_str());

    let job = h.submit("/videos/b.mp4").await;
    let (name, created) = events.next().await;
    assert_eq!(name, "created");
    assert_eq!(created["job"]["id"], job.id.as_str());

    let mut last = created;
    while last["job"]["status"] != "complete" {
        let (name, event) = events.next().await;
        assert_eq!(name, "updated");
        last = event;
    }
    assert_eq!(last["job"]["progress"], 100);
}

#[tokio::test]
async fn deletes_are_announced() {
    let h = worker("true").await;
    let job = h.submit("/videos/a.mp4").await;
    h.wait_for(&job.id, JobStatus::Complete).await;
    let mut events = EventReader::connect(&h).await;
    events.next().await;

    reqwest::Client::new().delete(h.url(&format!("/api/jobs/{}", job.id))).send().await.unwrap();

    let (name, event) = events.next().await;
    assert_eq!(name, "deleted");
    assert_eq!(event["id"], job.id.as_str());
}
