// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mp_adapters::{FakeProvider, ProviderCall};
use mp_core::test_support::pod_record;
use mp_core::{FakeClock, StartStrategy};
use mp_storage::{keys, Directory, MemoryDirectory};
use std::sync::Arc;
use yare::parameterized;

const MINUTE: Duration = Duration::from_secs(60);

struct Harness {
    reaper: IdleReaper<FakeProvider, FakeClock>,
    provider: FakeProvider,
    dir: MemoryDirectory,
    pods: PodDirectory,
    clock: FakeClock,
}

fn harness() -> Harness {
    let provider = FakeProvider::new();
    let dir = MemoryDirectory::new();
    let pods = PodDirectory::new(Arc::new(dir.clone()));
    let clock = FakeClock::new();
    let reaper = IdleReaper::new(provider.clone(), pods.clone(), clock.clone(), 15 * MINUTE);
    Harness { reaper, provider, dir, pods, clock }
}

impl Harness {
    async fn pod(&self, status: DesiredStatus, last_activity_ago: Duration) {
        let mut record = pod_record("pod1", status);
        record.uptime_secs = 600;
        self.provider.insert_pod(record);
        self.pods.record_start("pod1", StartStrategy::Create, self.clock.epoch_ms()).await.unwrap();
        self.pods.record_serving(Some("https://pod1")).await.unwrap();
        self.pods.touch(self.clock.ms_ago(last_activity_ago)).await.unwrap();
    }
}

#[tokio::test]
async fn no_pod_is_a_no_op() {
    let h = harness();
    assert_eq!(h.reaper.tick().await.unwrap(), ReapOutcome::NoPod);
    assert!(h.provider.calls().is_empty());
}

#[parameterized(
    ten_minutes = { 10, false },
    exactly_threshold = { 15, false },
    sixteen_minutes = { 16, true },
)]
#[test_macro(tokio::test)]
async fn running_pod_idle_threshold(idle_minutes: u32, stops: bool) {
    let h = harness();
    h.pod(DesiredStatus::Running, idle_minutes * MINUTE).await;

    let outcome = h.reaper.tick().await.unwrap();

    if stops {
        assert_eq!(outcome, ReapOutcome::Stopped { idle: Some(idle_minutes * MINUTE) });
        assert_eq!(h.provider.mutations(), vec![ProviderCall::Stop("pod1".into())]);
        let entries = h.dir.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key(keys::POD_ID));
    } else {
        assert_eq!(outcome, ReapOutcome::Active { idle: idle_minutes * MINUTE });
        assert!(h.provider.mutations().is_empty());
        assert_eq!(h.dir.entries().len(), 3);
    }
}

#[tokio::test]
async fn missing_last_activity_counts_as_idle() {
    let h = harness();
    h.pod(DesiredStatus::Running, Duration::ZERO).await;
    h.dir.delete(keys::LAST_ACTIVITY).await.unwrap();

    assert_eq!(h.reaper.tick().await.unwrap(), ReapOutcome::Stopped { idle: None });
    assert_eq!(h.provider.mutations(), vec![ProviderCall::Stop("pod1".into())]);
}

#[tokio::test]
async fn exited_pod_is_pruned() {
    let h = harness();
    h.pod(DesiredStatus::Exited, MINUTE).await;

    assert_eq!(h.reaper.tick().await.unwrap(), ReapOutcome::Pruned);
    assert_eq!(h.dir.entries().len(), 1);
    assert!(h.provider.mutations().is_empty());
}

#[tokio::test]
async fn vanished_pod_is_cleaned() {
    let h = harness();
    h.pod(DesiredStatus::Running, MINUTE).await;
    h.provider.remove_pod("pod1");

    assert_eq!(h.reaper.tick().await.unwrap(), ReapOutcome::Cleaned);
    assert!(h.dir.entries().is_empty());
}

#[tokio::test]
async fn unknown_pod_is_cleaned() {
    let h = harness();
    h.pod(DesiredStatus::Unknown, MINUTE).await;

    assert_eq!(h.reaper.tick().await.unwrap(), ReapOutcome::Cleaned);
    assert!(h.dir.entries().is_empty());
}

#[tokio::test]
async fn terminated_pod_is_left_alone() {
    let h = harness();
    h.pod(DesiredStatus::Terminated, 60 * MINUTE).await;
    let before = h.dir.entries();

    assert_eq!(h.reaper.tick().await.unwrap(), ReapOutcome::Skipped(DesiredStatus::Terminated));
    assert_eq!(h.dir.entries(), before);
    assert!(h.provider.mutations().is_empty());
}

#[tokio::test]
async fn stop_failure_is_reported_and_keys_kept() {
    let h = harness();
    h.pod(DesiredStatus::Running, 20 * MINUTE).await;
    h.provider.fail_stop();

    assert!(h.reaper.tick().await.is_err());
    assert_eq!(h.dir.entries().len(), 3);
}

#[tokio::test]
async fn spawned_loop_reaps_and_stops_on_cancel() {
    let h = harness();
    h.pod(DesiredStatus::Running, 20 * MINUTE).await;
    let cancel = CancellationToken::new();

    let provider = h.provider.clone();
    let handle = h.reaper.spawn(Duration::from_millis(10), cancel.clone());

    for _ in 0..100 {
        if !provider.mutations().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(provider.mutations(), vec![ProviderCall::Stop("pod1".into())]);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
}
