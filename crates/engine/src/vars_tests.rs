// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn vars() -> HashMap<&'static str, String> {
    HashMap::from([
        ("source", "/videos/my clip.mp4".to_string()),
        ("workdir", "/state/work/abc".to_string()),
        ("job_id", "abc".to_string()),
    ])
}

#[parameterized(
    plain = { "touch ${workdir}/result.glb", "touch '/state/work/abc'/result.glb" },
    spaces = { "ffmpeg -i ${source}", "ffmpeg -i '/videos/my clip.mp4'" },
    repeated = { "${job_id}-${job_id}", "'abc'-'abc'" },
    unknown = { "echo ${HOME}", "echo ${HOME}" },
    default_syntax = { "echo ${X:-y}", "echo ${X:-y}" },
    none = { "true", "true" },
)]
fn interpolation(template: &str, expected: &str) {
    assert_eq!(interpolate_shell(template, &vars()), expected);
}

#[test]
fn quotes_are_escaped() {
    assert_eq!(quote_for_shell("it's"), "'it'\\''s'");
}

#[tokio::test]
async fn quoted_values_survive_bash() {
    let vars = HashMap::from([("source", "a 'b' $(echo c) \"d\"".to_string())]);
    let cmd = interpolate_shell("printf %s ${source}", &vars);
    let output = tokio::process::Command::new("bash").arg("-c").arg(&cmd).output().await.unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a 'b' $(echo c) \"d\"");
}
