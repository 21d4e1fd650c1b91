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

//! Splits an upload stream of unknown length into fixed-size parts.

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::io;

use crate::types::ByteSource;

/// Multipart part size (10 MiB).
pub const PART_SIZE: usize = 10 * 1024 * 1024;

/// Re-chunks a byte source into parts of exactly `part_size` bytes.
///
/// Only the final part may be shorter. At most one part plus one incoming
/// chunk is buffered at a time.
pub struct PartSplitter<'a> {
    source: ByteSource<'a>,
    part_size: usize,
    pending: BytesMut,
    source_done: bool,
}

impl<'a> PartSplitter<'a> {
    /// Creates a splitter using `PART_SIZE`.
    pub fn new(source: ByteSource<'a>) -> Self {
        Self::with_part_size(source, PART_SIZE)
    }

    /// Creates a splitter with a custom part size.
    pub fn with_part_size(source: ByteSource<'a>, part_size: usize) -> Self {
        assert!(part_size > 0, "part size must be positive");
        Self {
            source,
            part_size,
            pending: BytesMut::new(),
            source_done: false,
        }
    }

    /// Returns the next part, or `None` once the source is drained.
    pub async fn next_part(&mut self) -> io::Result<Option<Bytes>> {
        while !self.source_done && self.pending.len() < self.part_size {
            match self.source.next().await {
                Some(chunk) => self.pending.extend_from_slice(&chunk?),
                None => self.source_done = true,
            }
        }

        if self.pending.is_empty() {
            return Ok(None);
        }

        let take = self.pending.len().min(self.part_size);
        Ok(Some(self.pending.split_to(take).freeze()))
    }

    /// True once the source has ended and every buffered byte was handed out.
    pub fn is_exhausted(&self) -> bool {
        self.source_done && self.pending.is_empty()
    }
}
