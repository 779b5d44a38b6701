// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in stage commands.

use super::{StageSpec, StepSpec};
use mp_core::Stage;
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

const NORMALIZE: &str =
    "ffmpeg -y -loglevel error -i ${source} -vf fps=30 -an ${workdir}/input.mp4";

const SILHOUETTE: &str = concat!(
    r#"printf '{"input_path":"%s","output_path":"%s"}' "#,
    "${workdir}/input.mp4 ${workdir}/silhouette.mp4 \\\n",
    "  | curl -fsS --max-time 1200 -X POST -H 'Content-Type: application/json' ",
    "--data-binary @- ${preprocessor}/api/v1/process-video >/dev/null\n",
    "mv ${workdir}/silhouette.mp4 ${workdir}/input.mp4",
);

const MOCAP: &str = concat!(
    "cd ${tools}/frankmocap\n",
    "python -m demo.demo_bodymocap --input_path ${workdir}/input.mp4 ",
    "--out_dir ${workdir}/mocap --save_pred_pkl --no_display",
);

const PKL_TO_NPZ: &str = concat!(
    "python ${tools}/frankmocap/pkl_to_npz.py --input_dir ${workdir}/mocap ",
    "--output ${workdir}/motion.npz --fps 30",
);

const NPZ_TO_GLB: &str = concat!(
    "blender -b --python ${tools}/npz_to_glb.py -- ",
    "--input ${workdir}/motion.npz --output ${workdir}/result.glb",
);

const OVERLAY_FRAMES: &str = concat!(
    "blender -b --python ${tools}/render_overlay.py -- --input ${workdir}/result.glb ",
    "--output_dir ${workdir}/overlay_frames --npz ${workdir}/motion.npz",
);

const OVERLAY_VIDEO: &str = concat!(
    "ffmpeg -y -loglevel error -i ${workdir}/input.mp4 -framerate 30 ",
    "-pattern_type glob -i ${workdir}/overlay_frames/'*.png' ",
    "-filter_complex '[0:v][1:v]overlay=shortest=1' -pix_fmt yuv420p ${workdir}/overlay.mp4",
);

const COMPARISON: &str = concat!(
    "ffmpeg -y -loglevel error -i ${workdir}/input.mp4 -i ${workdir}/overlay.mp4 ",
    "-filter_complex '[0:v][1:v]hstack=inputs=2:shortest=1' ",
    "-pix_fmt yuv420p ${workdir}/comparison.mp4",
);

const PREVIEW: &str =
    "ffmpeg -y -loglevel error -i ${workdir}/overlay.mp4 -frames:v 1 ${workdir}/preview.png";

pub(super) fn default_stages(with_preprocessor: bool) -> Vec<StageSpec> {
    let mut preprocess = vec![StepSpec::new("normalize", NORMALIZE, &["input.mp4"])];
    if with_preprocessor {
        preprocess.push(StepSpec::new("silhouette", SILHOUETTE, &["input.mp4"]));
    }

    vec![
        StageSpec { stage: Stage::Preprocess, steps: preprocess, timeout: 10 * MINUTE },
        StageSpec {
            stage: Stage::Extract,
            steps: vec![StepSpec::new("mocap", MOCAP, &["mocap"])],
            timeout: 60 * MINUTE,
        },
        StageSpec {
            stage: Stage::Convert,
            steps: vec![StepSpec::new("pkl_to_npz", PKL_TO_NPZ, &["motion.npz"])],
            timeout: 10 * MINUTE,
        },
        StageSpec {
            stage: Stage::Build,
            steps: vec![StepSpec::new("npz_to_glb", NPZ_TO_GLB, &["result.glb"])],
            timeout: 20 * MINUTE,
        },
        StageSpec {
            stage: Stage::Render,
            steps: vec![
                StepSpec::new("overlay_frames", OVERLAY_FRAMES, &["overlay_frames"]),
                StepSpec::new("overlay_video", OVERLAY_VIDEO, &["overlay.mp4"]),
            ],
            timeout: 20 * MINUTE,
        },
        StageSpec {
            stage: Stage::Composite,
            steps: vec![
                StepSpec::new("comparison", COMPARISON, &["comparison.mp4"]),
                StepSpec::new("preview", PREVIEW, &["preview.png"]),
            ],
            timeout: 10 * MINUTE,
        },
    ]
}
