// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    running = { "RUNNING", DesiredStatus::Running },
    exited = { "EXITED", DesiredStatus::Exited },
    terminated = { "TERMINATED", DesiredStatus::Terminated },
    created = { "CREATED", DesiredStatus::Unknown },
    empty = { "", DesiredStatus::Unknown },
)]
fn desired_status_parse(raw: &str, expected: DesiredStatus) {
    assert_eq!(DesiredStatus::parse(raw), expected);
}

#[test]
fn desired_status_deserializes_unknown_values() {
    let status: DesiredStatus = serde_json::from_str("\"MIGRATING\"").unwrap();
    assert_eq!(status, DesiredStatus::Unknown);
    let status: DesiredStatus = serde_json::from_str("\"EXITED\"").unwrap();
    assert_eq!(status, DesiredStatus::Exited);
}

#[test]
fn serving_requires_running_and_uptime() {
    let mut record = crate::test_support::pod_record("pod1", DesiredStatus::Running);
    assert!(!record.is_serving());
    record.uptime_secs = 12;
    assert!(record.is_serving());
    record.desired_status = DesiredStatus::Exited;
    assert!(!record.is_serving());
}

#[test]
fn start_strategy_parse() {
    assert_eq!(StartStrategy::parse("resume"), Some(StartStrategy::Resume));
    assert_eq!(StartStrategy::parse("create"), Some(StartStrategy::Create));
    assert_eq!(StartStrategy::parse("Create"), None);
    assert_eq!(StartStrategy::Create.to_string(), StartStrategy::Create.as_str());
}

#[test]
fn report_json_skips_absent_fields() {
    let json = serde_json::to_value(PodReport::stopped()).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "stopped" }));

    let report = PodReport::starting().with_progress(42, StartStrategy::Resume).with_pod_id("p1");
    let json = serde_json::to_value(report).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "status": "starting",
            "elapsedSeconds": 42,
            "strategy": "resume",
            "podId": "p1",
        })
    );

    let json = serde_json::to_value(PodReport::running().with_idle_minutes(3)).unwrap();
    assert_eq!(json["idleMinutes"], 3);
}

#[test]
fn gpu_priority_from_csv_keeps_order() {
    let list = GpuPriorityList::from_csv(" A100 , ,RTX 4090,A4000,");
    assert_eq!(list.iter().collect::<Vec<_>>(), vec!["A100", "RTX 4090", "A4000"]);
    assert_eq!(list.len(), 3);
    assert!(GpuPriorityList::from_csv("").is_empty());
}
