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

//! Data types shared by the storage client and the managers.

use bytes::Bytes;
use futures::Stream;
use std::fmt;
use std::io;
use std::pin::Pin;

/// Byte stream consumed by an upload. Borrows from the caller for `'a`.
pub type ByteSource<'a> = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'a>>;

/// Owned byte stream produced by a download.
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

/// One entry of a recursive object listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Object key, possibly containing `/` separators.
    pub key: String,
    /// True for zero-byte folder markers (keys ending in `/`).
    pub is_directory: bool,
    /// Size in bytes, when the backend reports it.
    pub size: Option<u64>,
}

impl ObjectEntry {
    /// Builds an entry, deriving `is_directory` from the key.
    pub fn new(key: impl Into<String>, size: Option<u64>) -> Self {
        let key = key.into();
        let is_directory = key.ends_with('/');
        Self {
            key,
            is_directory,
            size,
        }
    }
}

/// A listing entry the backend returned but that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Key of the entry, when it could be recovered.
    pub key: Option<String>,
    /// Why the entry was unreadable.
    pub reason: String,
}

/// Result of reading a single listing entry.
pub type ListedObject = Result<ObjectEntry, SkippedEntry>;

/// Outcome of `ObjectManager::list_files`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    /// Entries in backend order.
    pub entries: Vec<ObjectEntry>,
    /// Number of entries skipped because they could not be read.
    pub omitted: usize,
}

impl FileListing {
    /// True when every entry returned by the backend is present.
    pub fn is_complete(&self) -> bool {
        self.omitted == 0
    }
}

/// A live download. Dropping `body` releases the backend connection.
pub struct ObjectDownload {
    /// Object content, starting at the first byte.
    pub body: BodyStream,
    /// Content length, when the backend reports it.
    pub content_length: Option<u64>,
}

impl fmt::Debug for ObjectDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDownload")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
