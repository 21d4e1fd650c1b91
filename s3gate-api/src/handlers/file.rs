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

//! File operation handlers.
//!
//! - Upload (POST /file/uploadfile, multipart)
//! - List (GET /file/list?bucket=)
//! - Download (GET /file/download?bucket=&objectName=)
//! - Delete (GET /file/delete?bucket=&objectName=)

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use s3gate_core::{object_key, ByteSource, ObjectEntry};
use serde::Serialize;
use std::io;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use super::{required, BucketQuery, ObjectQuery};
use crate::errors::ApiError;
use crate::server::AppState;

/// Multipart field carrying the file content.
pub const UPLOAD_FIELD: &str = "uploadfile";

/// Response header reporting listing entries that could not be read.
pub const OMITTED_ENTRIES_HEADER: &str = "x-omitted-entries";

/// One entry of the `/file/list` response.
#[derive(Debug, Serialize)]
pub struct FileInfo {
    pub filename: String,
    pub directory: bool,
}

impl From<ObjectEntry> for FileInfo {
    fn from(entry: ObjectEntry) -> Self {
        Self {
            filename: entry.key,
            directory: entry.is_directory,
        }
    }
}

fn malformed(err: MultipartError) -> ApiError {
    ApiError::InvalidRequest(format!("malformed multipart body: {}", err.body_text()))
}

/// Uploads a file.
///
/// `bucket` and `objectName` come from the query string or from text fields
/// sent before the `uploadfile` part. The bucket is created when missing and
/// the part is streamed to the backend as it arrives.
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut bucket = query.bucket;
    let mut prefix = query.object_name;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("bucket") => bucket = Some(field.text().await.map_err(malformed)?),
            Some("objectName") => prefix = Some(field.text().await.map_err(malformed)?),
            Some(UPLOAD_FIELD) => {
                let filename = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ApiError::InvalidRequest("upload part has no filename".to_string())
                    })?;
                let bucket = required(bucket, "bucket")?;
                let key = object_key(prefix.as_deref(), &filename);

                info!("Upload: {}/{}", bucket, key);
                state.buckets.ensure_bucket(&bucket).await?;

                // Read failures on the request body are the client's, not the backend's.
                let read_error = OnceLock::new();
                let source: ByteSource<'_> = Box::pin(field.map_err(|e| {
                    let reason = e.body_text();
                    let _ = read_error.set(reason.clone());
                    io::Error::other(reason)
                }));
                let uploaded = state.objects.upload(source, &bucket, &key).await;
                if let Some(reason) = read_error.get() {
                    warn!(
                        "Upload of {}/{} aborted, request body unreadable: {}",
                        bucket, key, reason
                    );
                    return Err(ApiError::InvalidRequest(format!(
                        "upload body could not be read: {}",
                        reason
                    )));
                }
                uploaded?;

                return Ok((StatusCode::OK, "File uploaded successfully"));
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    Err(ApiError::MissingParameter(UPLOAD_FIELD))
}

/// Lists every file in a bucket recursively.
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<BucketQuery>,
) -> Result<Response, ApiError> {
    let bucket = required(query.bucket, "bucket")?;
    debug!("ListFiles: {}", bucket);

    let listing = state.objects.list_files(&bucket).await?;
    let omitted = listing.omitted;
    let files: Vec<FileInfo> = listing.entries.into_iter().map(FileInfo::from).collect();

    let mut response = Json(files).into_response();
    if omitted > 0 {
        response
            .headers_mut()
            .insert(OMITTED_ENTRIES_HEADER, HeaderValue::from(omitted));
    }
    Ok(response)
}

/// Streams an object to the client as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
) -> Result<Response, ApiError> {
    let bucket = required(query.bucket, "bucket")?;
    let key = required(query.object_name, "objectName")?;
    debug!("Download: {}/{}", bucket, key);

    let download = state.objects.download(&bucket, &key).await?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, content_disposition(&key));
    if let Some(len) = download.content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    builder
        .body(Body::from_stream(download.body))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Deletes an object.
pub async fn delete_file(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
) -> Result<StatusCode, ApiError> {
    let bucket = required(query.bucket, "bucket")?;
    let key = required(query.object_name, "objectName")?;
    info!("DeleteFile: {}/{}", bucket, key);

    state.objects.delete_object(&bucket, &key).await?;
    Ok(StatusCode::OK)
}

/// Builds `attachment; filename=<basename>` with the basename percent-encoded.
fn content_disposition(key: &str) -> String {
    let basename = key.rsplit('/').next().unwrap_or(key);
    format!("attachment; filename={}", urlencoding::encode(basename))
}
