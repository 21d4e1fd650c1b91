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

//! s3gate core - storage client adapter and gateway managers.
//!
//! This crate provides:
//! - The `StorageClient` trait over an S3-compatible backend
//! - An `aws-sdk-s3` implementation and an in-memory implementation
//! - Unified `BackendError` classification
//! - `BucketManager` and `ObjectManager` business logic

pub mod bucket;
pub mod client;
pub mod error;
pub mod object;
pub mod types;

pub use bucket::BucketManager;
pub use client::{
    BackendConfig, MemoryStorageClient, RetryPolicy, S3StorageClient, StorageClient, PART_SIZE,
};
pub use error::{BackendError, ErrorKind};
pub use object::{object_key, ObjectManager};
pub use types::{
    BodyStream, ByteSource, FileListing, ListedObject, ObjectDownload, ObjectEntry,
    SkippedEntry,
};
