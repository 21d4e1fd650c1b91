// Copyright 2026 S4Core Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! API Integration Tests
//!
//! Tests the gateway HTTP API using in-process requests against the
//! in-memory storage client. No actual network I/O - uses
//! tower::ServiceExt::oneshot directly.

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use s3gate_api::{create_router, AppState};
use s3gate_core::{ErrorKind, MemoryStorageClient, StorageClient};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "s3gate-test-boundary";

/// Creates an AppState backed by a fresh in-memory store.
fn create_test_state() -> (AppState, Arc<MemoryStorageClient>) {
    let client = Arc::new(MemoryStorageClient::new());
    (AppState::new(client.clone()), client)
}

/// Helper to read response body as bytes.
async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

/// Helper to read response body as JSON.
async fn body_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

/// One part of a multipart/form-data body.
enum Part<'a> {
    Text(&'a str, &'a str),
    File(Option<&'a str>, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(filename, data) => {
                let disposition = match filename {
                    Some(f) => format!(
                        "Content-Disposition: form-data; name=\"uploadfile\"; filename=\"{}\"\r\n",
                        f
                    ),
                    None => "Content-Disposition: form-data; name=\"uploadfile\"\r\n".to_string(),
                };
                body.extend_from_slice(disposition.as_bytes());
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(state: &AppState, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    create_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(state: &AppState, uri: &str) -> Response<Body> {
    create_router(state.clone())
        .oneshot(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

// ============================================================================
// Upload / Download Tests
// ============================================================================

#[tokio::test]
async fn test_upload_then_download() {
    let (state, _) = create_test_state();

    let response = upload(
        &state,
        "/file/uploadfile?bucket=photos",
        &[Part::File(Some("cat.jpg"), b"meow meow")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&state, "/file/download?bucket=photos&objectName=cat.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment; filename=cat.jpg");
    assert_eq!(headers[header::CONTENT_LENGTH], "9");
    assert_eq!(body_bytes(response.into_body()).await, b"meow meow");
}

#[tokio::test]
async fn test_upload_with_object_name_prefix() {
    let (state, client) = create_test_state();

    let response = upload(
        &state,
        "/file/uploadfile?bucket=docs&objectName=reports",
        &[Part::File(Some("q1.csv"), b"a,b\n1,2\n")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = client.get_object_stream("docs", "reports/q1.csv").await;
    assert!(stored.is_ok());

    let response = get(&state, "/file/download?bucket=docs&objectName=reports/q1.csv").await;
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=q1.csv"
    );
}

#[tokio::test]
async fn test_upload_params_as_form_fields() {
    let (state, client) = create_test_state();

    let response = upload(
        &state,
        "/file/uploadfile",
        &[
            Part::Text("bucket", "forms"),
            Part::Text("objectName", "inbox"),
            Part::File(Some("note.txt"), b"hi"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(client.object_count("forms").await, Some(1));
    assert!(client.get_object_stream("forms", "inbox/note.txt").await.is_ok());
}

#[tokio::test]
async fn test_upload_empty_file() {
    let (state, _) = create_test_state();

    let response =
        upload(&state, "/file/uploadfile?bucket=b", &[Part::File(Some("empty"), b"")]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&state, "/file/download?bucket=b&objectName=empty").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response.into_body()).await.is_empty());
}

#[tokio::test]
async fn test_upload_without_bucket() {
    let (state, _) = create_test_state();

    let response = upload(&state, "/file/uploadfile", &[Part::File(Some("a.txt"), b"x")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().contains_key("x-request-id"));

    let json = body_json(response.into_body()).await;
    assert_eq!(json["code"], "MissingParameter");
    assert!(json["requestId"].is_string());
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let (state, _) = create_test_state();

    let response = upload(&state, "/file/uploadfile?bucket=b", &[Part::Text("bucket", "b")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_filename() {
    let (state, client) = create_test_state();

    let response = upload(&state, "/file/uploadfile?bucket=b", &[Part::File(None, b"x")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(client.make_bucket_calls(), 0);
}

#[tokio::test]
async fn test_upload_backend_unreachable() {
    let (state, client) = create_test_state();
    client.fail_with(Some(ErrorKind::Network)).await;

    let response =
        upload(&state, "/file/uploadfile?bucket=b", &[Part::File(Some("a"), b"x")]).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["code"], "Network");
    assert!(!json["message"].as_str().unwrap().contains("injected"));
}

#[tokio::test]
async fn test_download_missing_object() {
    let (state, client) = create_test_state();
    client.make_bucket("b").await.unwrap();

    let response = get(&state, "/file/download?bucket=b&objectName=ghost.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_missing_param() {
    let (state, _) = create_test_state();

    let response = get(&state, "/file/download?bucket=b").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_encodes_filename() {
    let (state, _) = create_test_state();
    upload(
        &state,
        "/file/uploadfile?bucket=b",
        &[Part::File(Some("my report.pdf"), b"%PDF")],
    )
    .await;

    let response = get(&state, "/file/download?bucket=b&objectName=my%20report.pdf").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=my%20report.pdf"
    );
}

// ============================================================================
// Listing Tests
// ============================================================================

#[tokio::test]
async fn test_list_files_recursive() {
    let (state, _) = create_test_state();
    upload(&state, "/file/uploadfile?bucket=b", &[Part::File(Some("a"), b"1")]).await;
    upload(
        &state,
        "/file/uploadfile?bucket=b&objectName=dir",
        &[Part::File(Some("b"), b"2")],
    )
    .await;

    let response = get(&state, "/file/list?bucket=b").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-omitted-entries"));

    let json = body_json(response.into_body()).await;
    assert_eq!(
        json,
        json!([
            {"filename": "a", "directory": false},
            {"filename": "dir/b", "directory": false}
        ])
    );
}

#[tokio::test]
async fn test_list_files_reports_omitted_entries() {
    let (state, client) = create_test_state();
    upload(&state, "/file/uploadfile?bucket=b", &[Part::File(Some("a"), b"1")]).await;
    upload(&state, "/file/uploadfile?bucket=b", &[Part::File(Some("c"), b"2")]).await;
    client.mark_unreadable("b", "c").await;

    let response = get(&state, "/file/list?bucket=b").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-omitted-entries"], "1");

    let json = body_json(response.into_body()).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_files_missing_bucket() {
    let (state, _) = create_test_state();

    let response = get(&state, "/file/list?bucket=ghost").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Delete Tests
// ============================================================================

#[tokio::test]
async fn test_delete_file() {
    let (state, _) = create_test_state();
    upload(&state, "/file/uploadfile?bucket=b", &[Part::File(Some("k"), b"1")]).await;

    let response = get(&state, "/file/delete?bucket=b&objectName=k").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&state, "/file/delete?bucket=b&objectName=k").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Bucket Operations Tests
// ============================================================================

#[tokio::test]
async fn test_list_buckets() {
    let (state, client) = create_test_state();
    client.make_bucket("alpha").await.unwrap();
    client.make_bucket("beta").await.unwrap();

    let response = get(&state, "/bucket/list").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.into_body()).await, json!(["alpha", "beta"]));
}

#[tokio::test]
async fn test_list_buckets_auth_failure() {
    let (state, client) = create_test_state();
    client.fail_with(Some(ErrorKind::Auth)).await;

    let response = get(&state, "/bucket/list").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_bucket() {
    let (state, client) = create_test_state();
    client.make_bucket("old").await.unwrap();

    let response = get(&state, "/bucket/delete?bucket=old").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response.into_body()).await.is_empty());
    assert!(client.list_buckets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_bucket_errors() {
    let (state, _) = create_test_state();

    let response = get(&state, "/bucket/delete").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&state, "/bucket/delete?bucket=ghost").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_non_empty_bucket() {
    let (state, _) = create_test_state();
    upload(&state, "/file/uploadfile?bucket=full", &[Part::File(Some("k"), b"1")]).await;

    let response = get(&state, "/bucket/delete?bucket=full").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response.into_body()).await["code"], "Conflict");
}

// ============================================================================
// Misc
// ============================================================================

#[tokio::test]
async fn test_healthz() {
    let (state, _) = create_test_state();

    let response = get(&state, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"ok");
}

#[tokio::test]
async fn test_upload_exceeding_body_limit() {
    let (state, client) = create_test_state();
    let state = state.with_max_upload_size(1024);

    let response = upload(
        &state,
        "/file/uploadfile?bucket=small",
        &[Part::File(Some("big.bin"), &[0u8; 4096])],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response.into_body()).await["code"], "InvalidRequest");
    assert!(client.list_buckets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_truncated_upload_body_is_client_error() {
    let (state, client) = create_test_state();

    // File part without a closing boundary: the body ends mid-field.
    let mut body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"uploadfile\"; filename=\"cut.bin\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        BOUNDARY
    )
    .into_bytes();
    body.extend_from_slice(b"partial content");

    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/file/uploadfile?bucket=cut")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response.into_body()).await["code"], "InvalidRequest");
    assert_eq!(client.object_count("cut").await.unwrap(), 0);
}
