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

//! S3-compatible storage client built on `aws-sdk-s3`.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use aws_sdk_s3::{Client, Config as S3Config};
use bytes::Bytes;
use std::fmt;
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::part::PartSplitter;
use super::retry::RetryPolicy;
use super::StorageClient;
use crate::error::{BackendError, ErrorKind};
use crate::types::{ByteSource, ListedObject, ObjectDownload, ObjectEntry, SkippedEntry};

/// Region that must not be sent as a bucket location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for an S3-compatible backend.
#[derive(Clone)]
pub struct BackendConfig {
    /// Custom endpoint (e.g. `http://localhost:9000` for MinIO).
    pub endpoint: Option<String>,
    /// Region used for request signing.
    pub region: String,
    /// Access key ID.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Use path-style addressing (`endpoint/bucket/key`).
    pub force_path_style: bool,
    /// Connect timeout for new backend connections.
    pub connect_timeout: Duration,
    /// Retry policy for idempotent requests.
    pub retry: RetryPolicy,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: DEFAULT_REGION.to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            force_path_style: true,
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("force_path_style", &self.force_path_style)
            .field("connect_timeout", &self.connect_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Storage client for any S3-compatible server.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct S3StorageClient {
    client: Client,
    region: String,
    retry: RetryPolicy,
}

impl S3StorageClient {
    /// Builds the client from configuration.
    ///
    /// SDK-level retries are disabled; `config.retry` governs idempotent
    /// requests instead.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(BackendError::invalid_argument(
                "access key and secret key are required",
            ));
        }

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "s3gate",
        );

        let mut builder = S3Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.force_path_style)
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(config.connect_timeout)
                    .build(),
            );

        if let Some(endpoint) = &config.endpoint {
            debug!("Using custom endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            "S3 client initialized (endpoint: {:?}, region: {})",
            config.endpoint, config.region
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
            region: config.region.clone(),
            retry: config.retry,
        })
    }

    async fn head_bucket_once(&self, bucket: &str) -> Result<bool, BackendError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = classify("HeadBucket", e);
                if err.kind() == ErrorKind::NotFound {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn create_bucket_once(&self, bucket: &str) -> Result<(), BackendError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request.send().await.map_err(|e| classify("CreateBucket", e))?;
        Ok(())
    }

    async fn list_buckets_once(&self) -> Result<Vec<String>, BackendError> {
        let response =
            self.client.list_buckets().send().await.map_err(|e| classify("ListBuckets", e))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn list_page(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ListObjectsV2Output, BackendError> {
        self.client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| classify("ListObjectsV2", e))
    }

    async fn get_object_once(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectDownload, BackendError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("GetObject", e))?;

        let content_length = response.content_length().and_then(|l| u64::try_from(l).ok());
        let body = futures::stream::try_unfold(response.body, |mut body| async move {
            match body.try_next().await {
                Ok(Some(chunk)) => Ok(Some((chunk, body))),
                Ok(None) => Ok(None),
                Err(e) => Err(io::Error::other(e)),
            }
        });

        Ok(ObjectDownload {
            body: Box::pin(body),
            content_length,
        })
    }

    async fn put_single(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), BackendError> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(len as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| classify("PutObject", e))?;

        debug!("PutObject {}/{} ({} bytes)", bucket, key, len);
        Ok(())
    }

    async fn put_multipart(
        &self,
        bucket: &str,
        key: &str,
        first_part: Bytes,
        splitter: &mut PartSplitter<'_>,
    ) -> Result<(), BackendError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("CreateMultipartUpload", e))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| BackendError::internal("CreateMultipartUpload returned no upload id"))?
            .to_string();

        let mut guard = MultipartGuard::new(self.client.clone(), bucket, key, &upload_id);

        let mut parts = Vec::new();
        let mut next = Some(first_part);
        let mut part_number: i32 = 1;
        let mut total: u64 = 0;

        while let Some(data) = next {
            let len = data.len();
            let uploaded = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(&upload_id)
                .part_number(part_number)
                .content_length(len as i64)
                .body(ByteStream::from(data))
                .send()
                .await;

            let uploaded = match uploaded {
                Ok(output) => output,
                Err(e) => {
                    let err = classify("UploadPart", e);
                    guard.abort().await;
                    return Err(err);
                }
            };

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(uploaded.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
            total += len as u64;
            part_number += 1;

            next = match splitter.next_part().await {
                Ok(part) => part,
                Err(e) => {
                    guard.abort().await;
                    return Err(e.into());
                }
            };
        }

        let completed = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(parts)).build())
            .send()
            .await;

        if let Err(e) = completed {
            let err = classify("CompleteMultipartUpload", e);
            guard.abort().await;
            return Err(err);
        }
        guard.disarm();

        debug!(
            "Multipart upload {}/{} completed ({} parts, {} bytes)",
            bucket,
            key,
            part_number - 1,
            total
        );
        Ok(())
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        self.retry.run("HeadBucket", || self.head_bucket_once(bucket)).await
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        self.retry.run("CreateBucket", || self.create_bucket_once(bucket)).await
    }

    async fn remove_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify("DeleteBucket", e))?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, BackendError> {
        self.retry.run("ListBuckets", || self.list_buckets_once()).await
    }

    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        body: ByteSource<'_>,
    ) -> Result<(), BackendError> {
        let mut splitter = PartSplitter::new(body);
        let first = splitter.next_part().await?.unwrap_or_default();

        if splitter.is_exhausted() {
            self.put_single(bucket, key, first).await
        } else {
            self.put_multipart(bucket, key, first, &mut splitter).await
        }
    }

    async fn get_object_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectDownload, BackendError> {
        self.retry.run("GetObject", || self.get_object_once(bucket, key)).await
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ListedObject>, BackendError> {
        let mut listed = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let token = continuation_token.take();
            let page = self
                .retry
                .run("ListObjectsV2", || self.list_page(bucket, token.clone()))
                .await?;

            for object in page.contents() {
                let entry = match object.key() {
                    Some(key) => Ok(ObjectEntry::new(
                        key,
                        object.size().and_then(|s| u64::try_from(s).ok()),
                    )),
                    None => Err(SkippedEntry {
                        key: None,
                        reason: "listing entry has no key".to_string(),
                    }),
                };
                listed.push(entry);
            }

            match page.next_continuation_token() {
                Some(next) if page.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(next.to_string());
                }
                _ => break,
            }
        }

        debug!("ListObjectsV2 {}: {} entries", bucket, listed.len());
        Ok(listed)
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), BackendError> {
        // DeleteObject succeeds for missing keys, so existence is checked first.
        self.client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("HeadObject", e))?;

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("DeleteObject", e))?;
        Ok(())
    }
}

/// Aborts an in-flight multipart upload unless disarmed.
///
/// Dropping an armed guard (e.g. the request future was cancelled because
/// the client disconnected) spawns the abort in the background.
struct MultipartGuard {
    client: Client,
    bucket: String,
    key: String,
    upload_id: String,
    armed: bool,
}

impl MultipartGuard {
    fn new(client: Client, bucket: &str, key: &str, upload_id: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    async fn abort(&mut self) {
        self.armed = false;
        abort_upload(&self.client, &self.bucket, &self.key, &self.upload_id).await;
    }
}

impl Drop for MultipartGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                "Multipart upload {} for {}/{} left open: no runtime to abort it",
                self.upload_id, self.bucket, self.key
            );
            return;
        };
        let client = self.client.clone();
        let bucket = std::mem::take(&mut self.bucket);
        let key = std::mem::take(&mut self.key);
        let upload_id = std::mem::take(&mut self.upload_id);
        handle.spawn(async move {
            abort_upload(&client, &bucket, &key, &upload_id).await;
        });
    }
}

async fn abort_upload(client: &Client, bucket: &str, key: &str, upload_id: &str) {
    match client
        .abort_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(upload_id)
        .send()
        .await
    {
        Ok(_) => debug!("Aborted multipart upload {} for {}/{}", upload_id, bucket, key),
        Err(e) => warn!(
            "Failed to abort multipart upload {} for {}/{}: {}",
            upload_id,
            bucket,
            key,
            DisplayErrorContext(&e)
        ),
    }
}

/// Converts an SDK failure into a classified `BackendError`.
fn classify<E>(operation: &str, err: SdkError<E, HttpResponse>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let kind = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => ErrorKind::Network,
        SdkError::ConstructionFailure(_) => ErrorKind::InvalidArgument,
        SdkError::ServiceError(context) => {
            classify_service_error(context.err().code(), Some(context.raw().status().as_u16()))
        }
        _ => ErrorKind::Internal,
    };
    BackendError::new(kind, format!("{}: {}", operation, DisplayErrorContext(&err)))
}

/// Maps an S3 error code and HTTP status to an `ErrorKind`.
///
/// The code wins when it is recognised. HEAD responses carry no body, so
/// the status is the only signal there.
pub fn classify_service_error(code: Option<&str>, status: Option<u16>) -> ErrorKind {
    if let Some(code) = code {
        match code {
            "NoSuchBucket" | "NoSuchKey" | "NotFound" | "NoSuchUpload" => {
                return ErrorKind::NotFound
            }
            "BucketAlreadyExists" | "BucketAlreadyOwnedByYou" | "BucketNotEmpty"
            | "OperationAborted" => return ErrorKind::Conflict,
            "InvalidBucketName" | "InvalidArgument" | "InvalidRequest" | "KeyTooLongError"
            | "MalformedXML" | "EntityTooLarge" | "EntityTooSmall" | "InvalidPart"
            | "InvalidPartOrder" | "InvalidObjectName" => return ErrorKind::InvalidArgument,
            "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken"
            | "InvalidToken" | "AccountProblem" | "AllAccessDisabled" => return ErrorKind::Auth,
            "RequestTimeout" | "SlowDown" | "ServiceUnavailable" => return ErrorKind::Network,
            _ => {}
        }
    }

    match status {
        Some(404) => ErrorKind::NotFound,
        Some(409) => ErrorKind::Conflict,
        Some(400) | Some(411) | Some(413) => ErrorKind::InvalidArgument,
        Some(401) | Some(403) => ErrorKind::Auth,
        Some(408) | Some(503) => ErrorKind::Network,
        _ => ErrorKind::Internal,
    }
}
