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

//! Storage client adapter.
//!
//! A `StorageClient` is one long-lived handle to the backend object store.
//! Implementations:
//!
//! - **S3**: any S3-compatible server (MinIO, Ceph RGW, AWS S3) via `aws-sdk-s3`
//! - **Memory**: in-process store used by tests and local runs

mod memory;
mod part;
mod retry;
mod s3;

pub use memory::MemoryStorageClient;
pub use part::{PartSplitter, PART_SIZE};
pub use retry::RetryPolicy;
pub use s3::{classify_service_error, BackendConfig, S3StorageClient};

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{ByteSource, ListedObject, ObjectDownload};

/// Primitive operations against the backend store.
///
/// Implementations carry no business logic and report every failure as a
/// classified `BackendError`. They must be safe for concurrent use.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Returns whether the bucket exists.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError>;

    /// Creates a bucket. Fails with `Conflict` if it already exists.
    async fn make_bucket(&self, bucket: &str) -> Result<(), BackendError>;

    /// Removes an empty bucket.
    ///
    /// Fails with `NotFound` if it does not exist and `Conflict` if it still
    /// holds objects.
    async fn remove_bucket(&self, bucket: &str) -> Result<(), BackendError>;

    /// Lists bucket names in backend order.
    async fn list_buckets(&self) -> Result<Vec<String>, BackendError>;

    /// Streams `body` into `bucket/key`.
    ///
    /// The length is not known in advance. Sources larger than one part are
    /// transferred as a multipart upload of `PART_SIZE` parts.
    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        body: ByteSource<'_>,
    ) -> Result<(), BackendError>;

    /// Opens a stream over the object content.
    async fn get_object_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectDownload, BackendError>;

    /// Recursively lists every object in the bucket, exhausting pagination.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ListedObject>, BackendError>;

    /// Removes an object. Fails with `NotFound` if it does not exist.
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), BackendError>;
}
