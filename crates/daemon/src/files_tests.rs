// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    glb = { "result.glb", "model/gltf-binary" },
    mp4 = { "comparison.mp4", "video/mp4" },
    png = { "preview.png", "image/png" },
    other = { "notes", "application/octet-stream" },
)]
fn content_type_by_extension(name: &str, expected: &str) {
    assert_eq!(content_type(name), expected);
}

#[tokio::test]
async fn serve_streams_file_with_headers() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("result.glb");
    std::fs::write(&path, b"glTF").unwrap();

    let response = serve(&path, "result.glb").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "model/gltf-binary");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"glTF");
}
