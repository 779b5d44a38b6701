// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::broadcast::EventBroadcaster;
use crate::job_logger::JobLogger;
use crate::jobs::JobServiceConfig;
use crate::pipeline::StageSpec;
use mp_core::{FakeClock, JobEvent, JobStatus};
use mp_storage::{JobRepository, ResultStore};
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    jobs: JobService<FakeClock>,
    events: EventBroadcaster,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let events = EventBroadcaster::new(1024);
        let config = JobServiceConfig {
            work_root: dir.path().join("work"),
            results: ResultStore::new(dir.path().join("results")),
            logger: JobLogger::new(dir.path().join("logs")),
        };
        let jobs = JobService::open(
            JobRepository::new(dir.path().join("jobs.json")),
            events.clone(),
            config,
            FakeClock::new(),
        )
        .unwrap();
        Self { dir, jobs, events }
    }

    fn executor(&self, stages: Vec<StageSpec>) -> PipelineExecutor<FakeClock> {
        let config = PipelineConfig::with_stages(stages, self.dir.path());
        PipelineExecutor::new(self.jobs.clone(), config)
    }
}

fn stage(stage: Stage, steps: Vec<StepSpec>) -> StageSpec {
    StageSpec { stage, steps, timeout: Duration::from_secs(10) }
}

fn touch(label: &str, file: &str) -> StepSpec {
    StepSpec::new(label, format!("touch {file}"), &[file])
}

/// Every stage succeeds, producing the files the next ones expect.
fn happy_stages() -> Vec<StageSpec> {
    vec![
        stage(
            Stage::Preprocess,
            vec![StepSpec::new("normalize", "cp ${source} ${workdir}/input.mp4", &["input.mp4"])],
        ),
        stage(Stage::Extract, vec![StepSpec::new("mocap", "mkdir -p mocap", &["mocap"])]),
        stage(Stage::Convert, vec![touch("pkl_to_npz", "motion.npz")]),
        stage(
            Stage::Build,
            vec![StepSpec::new("npz_to_glb", "echo glb > result.glb", &["result.glb"])],
        ),
        stage(Stage::Render, vec![touch("overlay", "overlay.mp4")]),
        stage(
            Stage::Composite,
            vec![touch("comparison", "comparison.mp4"), touch("preview", "preview.png")],
        ),
    ]
}

fn with_stage(mut stages: Vec<StageSpec>, replacement: StageSpec) -> Vec<StageSpec> {
    for s in stages.iter_mut() {
        if s.stage == replacement.stage {
            *s = replacement.clone();
        }
    }
    stages
}

fn source(h: &Harness) -> String {
    let path = h.dir.path().join("source video.mp4");
    std::fs::write(&path, b"video").unwrap();
    path.display().to_string()
}

#[tokio::test]
async fn happy_path_completes_and_publishes() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();

    let done = h.executor(happy_stages()).run(&job.id, &cancel).await.unwrap().unwrap();

    assert_eq!(done.status, JobStatus::Complete);
    assert_eq!(done.progress, 100);
    assert!(done.warnings.is_empty());
    assert_eq!(done.artifacts, vec!["result.glb", "overlay.mp4", "comparison.mp4", "preview.png"]);
    let results = &h.jobs.config().results;
    let glb = results.find(job.id.as_str(), "result.glb").await.unwrap().unwrap();
    assert_eq!(std::fs::read_to_string(glb).unwrap(), "glb\n");
}

#[tokio::test]
async fn progress_moves_through_every_band() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();
    let mut rx = h.events.subscribe();

    h.executor(happy_stages()).run(&job.id, &cancel).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(JobEvent::Updated { job }) = rx.try_recv() {
        seen.push((job.status, job.progress));
    }
    let progress: Vec<u8> = seen.iter().map(|(_, p)| *p).collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
    assert!(seen.contains(&(JobStatus::Extracting, 10)));
    assert!(seen.contains(&(JobStatus::Building, 85)));
    assert!(seen.contains(&(JobStatus::Compositing, 97)));
    assert_eq!(seen.last(), Some(&(JobStatus::Complete, 100)));
}

#[tokio::test]
async fn build_exiting_zero_without_output_fails_job() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();
    let stages = with_stage(
        happy_stages(),
        stage(Stage::Build, vec![StepSpec::new("npz_to_glb", "true", &["result.glb"])]),
    );

    let done = h.executor(stages).run(&job.id, &cancel).await.unwrap().unwrap();

    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(
        done.error.as_deref(),
        Some("build: `npz_to_glb` exited 0 but did not produce result.glb")
    );
    assert!(done.artifacts.is_empty());
    assert!(!h.jobs.work_dir(&job.id).join("overlay.mp4").exists());
}

#[tokio::test]
async fn build_without_declared_outputs_still_checks_primary_artifact() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();
    let stages =
        with_stage(happy_stages(), stage(Stage::Build, vec![StepSpec::new("custom", "true", &[])]));

    let done = h.executor(stages).run(&job.id, &cancel).await.unwrap().unwrap();

    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(
        done.error.as_deref(),
        Some("build: `build` exited 0 but did not produce result.glb")
    );
}

#[tokio::test]
async fn fatal_failure_skips_remaining_stages() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();
    let stages = with_stage(
        happy_stages(),
        stage(
            Stage::Extract,
            vec![StepSpec::new("mocap", "echo 'no person detected' >&2; exit 4", &["mocap"])],
        ),
    );

    let done = h.executor(stages).run(&job.id, &cancel).await.unwrap().unwrap();

    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.error.as_deref(), Some("extract: `mocap` failed (exit 4): no person detected"));
    assert!(!h.jobs.work_dir(&job.id).join("motion.npz").exists());

    let log = std::fs::read_to_string(h.jobs.config().logger.log_path(job.id.as_str())).unwrap();
    assert!(log.contains("no person detected"));
}

#[tokio::test]
async fn cosmetic_failure_becomes_warning() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();
    let stages = with_stage(
        happy_stages(),
        stage(Stage::Render, vec![StepSpec::new("overlay", "exit 1", &["overlay.mp4"])]),
    );

    let done = h.executor(stages).run(&job.id, &cancel).await.unwrap().unwrap();

    assert_eq!(done.status, JobStatus::Complete);
    assert_eq!(done.error, None);
    assert_eq!(done.warnings, vec!["render: `overlay` failed (exit 1): ".to_string()]);
    assert!(done.artifacts.contains(&"result.glb".to_string()));
    assert!(!done.artifacts.contains(&"overlay.mp4".to_string()));
}

#[tokio::test]
async fn composite_sub_steps_are_best_effort() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();
    let stages = with_stage(
        happy_stages(),
        stage(
            Stage::Composite,
            vec![
                StepSpec::new("comparison", "true", &["comparison.mp4"]),
                touch("preview", "preview.png"),
            ],
        ),
    );

    let done = h.executor(stages).run(&job.id, &cancel).await.unwrap().unwrap();

    assert_eq!(done.status, JobStatus::Complete);
    assert_eq!(done.warnings.len(), 1);
    assert!(done.artifacts.contains(&"preview.png".to_string()));
}

#[tokio::test]
async fn step_timeout_is_a_stage_failure() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();
    let stages = with_stage(
        happy_stages(),
        StageSpec {
            stage: Stage::Convert,
            steps: vec![StepSpec::new("pkl_to_npz", "sleep 30", &["motion.npz"])],
            timeout: Duration::from_millis(200),
        },
    );

    let done = h.executor(stages).run(&job.id, &cancel).await.unwrap().unwrap();

    assert_eq!(done.status, JobStatus::Failed);
    assert!(done.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn source_is_shell_quoted() {
    let h = Harness::new();
    let tricky = h.dir.path().join("it's; a $video.mp4");
    std::fs::write(&tricky, b"video").unwrap();
    let (job, cancel) = h.jobs.create(&tricky.display().to_string()).unwrap();

    let done = h.executor(happy_stages()).run(&job.id, &cancel).await.unwrap().unwrap();

    assert_eq!(done.status, JobStatus::Complete);
    assert_eq!(std::fs::read(h.jobs.work_dir(&job.id).join("input.mp4")).unwrap(), b"video");
}

#[tokio::test]
async fn delete_mid_stage_stops_without_updating() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();
    let stages = with_stage(
        happy_stages(),
        stage(Stage::Extract, vec![StepSpec::new("mocap", "sleep 30", &["mocap"])]),
    );
    let executor = h.executor(stages);
    let run = {
        let id = job.id.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { executor.run(&id, &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    h.jobs.delete(&job.id).await.unwrap();

    let outcome =
        tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap().unwrap();
    assert_eq!(outcome, None);
    assert!(h.jobs.get(&job.id).is_none());
}

#[tokio::test]
async fn finished_jobs_are_not_rerun() {
    let h = Harness::new();
    let (job, cancel) = h.jobs.create(&source(&h)).unwrap();
    h.jobs.update(&job.id, JobPatch::failed("earlier")).unwrap();

    let done = h.executor(happy_stages()).run(&job.id, &cancel).await.unwrap().unwrap();

    assert_eq!(done.error.as_deref(), Some("earlier"));
    assert!(!h.jobs.work_dir(&job.id).exists());
}

#[test]
fn interpolate_spans_band() {
    assert_eq!(interpolate(95, 99, 1, 2), 97);
    assert_eq!(interpolate(95, 99, 2, 2), 99);
    assert_eq!(interpolate(10, 55, 1, 1), 55);
}

#[test]
fn tail_keeps_last_lines() {
    let text = (1..=30).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
    let kept = tail(&text, 3);
    assert_eq!(kept, "28\n29\n30");
}
