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

//! Bucket lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::client::StorageClient;
use crate::error::{BackendError, ErrorKind};

type LockMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Bucket operations on top of a `StorageClient`.
pub struct BucketManager {
    client: Arc<dyn StorageClient>,
    creation_locks: LockMap,
}

/// A handle on the per-name creation lock.
///
/// Dropping the last handle for a name removes its map entry, including
/// when the owning future is cancelled mid-wait.
struct CreationLock<'a> {
    locks: &'a LockMap,
    name: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> CreationLock<'a> {
    fn acquire(locks: &'a LockMap, name: &'a str) -> Self {
        let lock = locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .clone();
        Self { locks, name, lock }
    }
}

impl Drop for CreationLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this handle are the only owners left.
        if locks
            .get(self.name)
            .is_some_and(|entry| Arc::strong_count(entry) == 2)
        {
            locks.remove(self.name);
        }
    }
}

impl BucketManager {
    pub fn new(client: Arc<dyn StorageClient>) -> Self {
        Self {
            client,
            creation_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Makes sure `bucket` exists, creating it if necessary.
    ///
    /// Idempotent. Concurrent calls for the same name issue at most one
    /// create request from this process, and a `Conflict` from a racing
    /// creator elsewhere counts as success.
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        let creation = CreationLock::acquire(&self.creation_locks, bucket);
        let _guard = creation.lock.lock().await;
        self.create_if_missing(bucket).await
    }

    #[cfg(test)]
    fn pending_locks(&self) -> usize {
        self.creation_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn create_if_missing(&self, bucket: &str) -> Result<(), BackendError> {
        if self.client.bucket_exists(bucket).await? {
            debug!("Bucket {} already exists", bucket);
            return Ok(());
        }

        match self.client.make_bucket(bucket).await {
            Ok(()) => {
                info!("Created bucket {}", bucket);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::Conflict => {
                debug!("Bucket {} created concurrently: {}", bucket, e.message());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Lists all bucket names.
    pub async fn list_buckets(&self) -> Result<Vec<String>, BackendError> {
        self.client.list_buckets().await
    }

    /// Deletes an empty bucket. Does not remove contained objects.
    pub async fn delete_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        self.client.remove_bucket(bucket).await?;
        info!("Deleted bucket {}", bucket);
        Ok(())
    }
}
