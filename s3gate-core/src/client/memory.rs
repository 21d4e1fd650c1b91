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

//! In-memory storage client.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::part::PartSplitter;
use super::StorageClient;
use crate::error::{BackendError, ErrorKind};
use crate::types::{ByteSource, ListedObject, ObjectDownload, ObjectEntry, SkippedEntry};

/// Chunk size used when streaming downloads.
const DOWNLOAD_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    parts: usize,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, BTreeMap<String, StoredObject>>,
    unreadable: BTreeSet<(String, String)>,
    fail_with: Option<ErrorKind>,
}

/// A `StorageClient` keeping every bucket in process memory.
///
/// Follows S3 semantics for the operations the gateway uses. Objects are
/// committed only after the whole upload stream was consumed.
#[derive(Debug, Default)]
pub struct MemoryStorageClient {
    state: RwLock<State>,
    make_bucket_calls: AtomicUsize,
}

impl MemoryStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with `kind` (or succeed again
    /// with `None`).
    pub async fn fail_with(&self, kind: Option<ErrorKind>) {
        self.state.write().await.fail_with = kind;
    }

    /// Marks a stored object as unreadable in listings.
    pub async fn mark_unreadable(&self, bucket: &str, key: &str) {
        self.state
            .write()
            .await
            .unreadable
            .insert((bucket.to_string(), key.to_string()));
    }

    /// Number of `make_bucket` calls received, successful or not.
    pub fn make_bucket_calls(&self) -> usize {
        self.make_bucket_calls.load(Ordering::SeqCst)
    }

    /// Number of parts the stored object was uploaded in.
    pub async fn part_count(&self, bucket: &str, key: &str) -> Option<usize> {
        let state = self.state.read().await;
        state.buckets.get(bucket)?.get(key).map(|o| o.parts)
    }

    /// Number of objects in a bucket.
    pub async fn object_count(&self, bucket: &str) -> Option<usize> {
        self.state.read().await.buckets.get(bucket).map(BTreeMap::len)
    }

    async fn check_fault(&self) -> Result<(), BackendError> {
        match self.state.read().await.fail_with {
            Some(kind) => Err(BackendError::new(kind, "injected failure")),
            None => Ok(()),
        }
    }
}

fn no_such_bucket(bucket: &str) -> BackendError {
    BackendError::not_found(format!("bucket '{}' does not exist", bucket))
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        self.check_fault().await?;
        Ok(self.state.read().await.buckets.contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        self.make_bucket_calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;
        self.check_fault().await?;

        if bucket.is_empty() {
            return Err(BackendError::invalid_argument("bucket name must not be empty"));
        }

        let mut state = self.state.write().await;
        if state.buckets.contains_key(bucket) {
            return Err(BackendError::conflict(format!(
                "bucket '{}' already exists",
                bucket
            )));
        }
        state.buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        self.check_fault().await?;
        let mut state = self.state.write().await;
        let empty = state
            .buckets
            .get(bucket)
            .map(BTreeMap::is_empty)
            .ok_or_else(|| no_such_bucket(bucket))?;
        if !empty {
            return Err(BackendError::conflict(format!(
                "bucket '{}' is not empty",
                bucket
            )));
        }
        state.buckets.remove(bucket);
        state.unreadable.retain(|(b, _)| b != bucket);
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, BackendError> {
        self.check_fault().await?;
        Ok(self.state.read().await.buckets.keys().cloned().collect())
    }

    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        body: ByteSource<'_>,
    ) -> Result<(), BackendError> {
        self.check_fault().await?;
        if key.is_empty() {
            return Err(BackendError::invalid_argument("object key must not be empty"));
        }
        if !self.state.read().await.buckets.contains_key(bucket) {
            return Err(no_such_bucket(bucket));
        }

        let mut splitter = PartSplitter::new(body);
        let mut data = Vec::new();
        let mut parts = 0;
        while let Some(part) = splitter.next_part().await? {
            data.extend_from_slice(&part);
            parts += 1;
        }

        let mut state = self.state.write().await;
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data: Bytes::from(data),
                parts: parts.max(1),
            },
        );
        Ok(())
    }

    async fn get_object_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectDownload, BackendError> {
        self.check_fault().await?;
        let state = self.state.read().await;
        let object = state
            .buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?
            .get(key)
            .ok_or_else(|| BackendError::not_found(format!("no such key '{}'", key)))?;

        let data = object.data.clone();
        let content_length = data.len() as u64;
        let chunks: Vec<std::io::Result<Bytes>> = (0..data.len())
            .step_by(DOWNLOAD_CHUNK)
            .map(|start| Ok(data.slice(start..(start + DOWNLOAD_CHUNK).min(data.len()))))
            .collect();

        Ok(ObjectDownload {
            body: Box::pin(futures::stream::iter(chunks)),
            content_length: Some(content_length),
        })
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ListedObject>, BackendError> {
        self.check_fault().await?;
        let state = self.state.read().await;
        let objects = state.buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;

        Ok(objects
            .iter()
            .map(|(key, object)| {
                if state.unreadable.contains(&(bucket.to_string(), key.clone())) {
                    Err(SkippedEntry {
                        key: Some(key.clone()),
                        reason: "entry could not be decoded".to_string(),
                    })
                } else {
                    Ok(ObjectEntry::new(key.clone(), Some(object.data.len() as u64)))
                }
            })
            .collect())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), BackendError> {
        self.check_fault().await?;
        let mut state = self.state.write().await;
        let removed = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?
            .remove(key);
        if removed.is_none() {
            return Err(BackendError::not_found(format!("no such key '{}'", key)));
        }
        state.unreadable.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, TryStreamExt};

    fn body(data: &'static [u8]) -> ByteSource<'static> {
        Box::pin(stream::iter(vec![Ok(Bytes::from_static(data))]))
    }

    #[tokio::test]
    async fn test_make_bucket_twice_conflicts() {
        let client = MemoryStorageClient::new();
        client.make_bucket("photos").await.unwrap();

        let err = client.make_bucket("photos").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(client.make_bucket_calls(), 2);
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let client = MemoryStorageClient::new();
        client.make_bucket("photos").await.unwrap();
        client
            .put_object_stream("photos", "cat.jpg", body(b"meow"))
            .await
            .unwrap();

        let download = client.get_object_stream("photos", "cat.jpg").await.unwrap();
        assert_eq!(download.content_length, Some(4));
        let chunks: Vec<Bytes> = download.body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"meow");
        assert_eq!(client.part_count("photos", "cat.jpg").await, Some(1));
    }

    #[tokio::test]
    async fn test_failed_stream_commits_nothing() {
        let client = MemoryStorageClient::new();
        client.make_bucket("photos").await.unwrap();

        let failing: ByteSource<'static> = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"part")),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone")),
        ]));
        let err = client
            .put_object_stream("photos", "cat.jpg", failing)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(client.object_count("photos").await, Some(0));
    }

    #[tokio::test]
    async fn test_remove_non_empty_bucket_conflicts() {
        let client = MemoryStorageClient::new();
        client.make_bucket("photos").await.unwrap();
        client.put_object_stream("photos", "a", body(b"x")).await.unwrap();

        let err = client.remove_bucket("photos").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let client = MemoryStorageClient::new();
        client.fail_with(Some(ErrorKind::Auth)).await;
        assert_eq!(client.list_buckets().await.unwrap_err().kind(), ErrorKind::Auth);

        client.fail_with(None).await;
        assert!(client.list_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_reported() {
        let client = MemoryStorageClient::new();
        client.make_bucket("docs").await.unwrap();
        client.put_object_stream("docs", "a", body(b"1")).await.unwrap();
        client.put_object_stream("docs", "b", body(b"2")).await.unwrap();
        client.mark_unreadable("docs", "b").await;

        let listed = client.list_objects("docs").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].is_ok());
        assert_eq!(listed[1].as_ref().unwrap_err().key.as_deref(), Some("b"));
    }
}
