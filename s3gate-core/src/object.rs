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

//! Object transfer, listing and removal.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::StorageClient;
use crate::error::BackendError;
use crate::types::{ByteSource, FileListing, ObjectDownload};

/// Builds the object key for an uploaded file.
///
/// A present, non-empty prefix is joined to the filename with a single `/`.
/// No other normalization is applied.
pub fn object_key(prefix: Option<&str>, filename: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, filename),
        _ => filename.to_string(),
    }
}

/// Object operations on top of a `StorageClient`.
pub struct ObjectManager {
    client: Arc<dyn StorageClient>,
}

impl ObjectManager {
    pub fn new(client: Arc<dyn StorageClient>) -> Self {
        Self { client }
    }

    /// Streams `source` into `bucket/key`.
    ///
    /// Nothing becomes visible under `key` unless the whole stream was
    /// transferred.
    pub async fn upload(
        &self,
        source: ByteSource<'_>,
        bucket: &str,
        key: &str,
    ) -> Result<(), BackendError> {
        self.client.put_object_stream(bucket, key, source).await?;
        info!("Uploaded {}/{}", bucket, key);
        Ok(())
    }

    /// Lists every object in the bucket recursively.
    ///
    /// Entries that cannot be read are skipped and counted in
    /// `FileListing::omitted`. Failing to read a page fails the call.
    pub async fn list_files(&self, bucket: &str) -> Result<FileListing, BackendError> {
        let mut listing = FileListing::default();

        for item in self.client.list_objects(bucket).await? {
            match item {
                Ok(entry) => listing.entries.push(entry),
                Err(skipped) => {
                    warn!(
                        "Skipping unreadable entry {:?} in bucket {}: {}",
                        skipped.key, bucket, skipped.reason
                    );
                    listing.omitted += 1;
                }
            }
        }

        debug!(
            "Listed {} objects in {} ({} omitted)",
            listing.entries.len(),
            bucket,
            listing.omitted
        );
        Ok(listing)
    }

    /// Opens a download stream.
    pub async fn download(&self, bucket: &str, key: &str) -> Result<ObjectDownload, BackendError> {
        self.client.get_object_stream(bucket, key).await
    }

    /// Deletes an object. Fails with `NotFound` if it does not exist.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BackendError> {
        self.client.remove_object(bucket, key).await?;
        info!("Deleted {}/{}", bucket, key);
        Ok(())
    }
}
