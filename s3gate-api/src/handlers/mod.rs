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

//! HTTP request handlers.
//!
//! This module provides handlers for:
//! - Bucket operations (list, delete)
//! - File operations (upload, list, download, delete)
//! - Health and metrics endpoints

pub mod bucket;
pub mod file;
pub mod stats;

use serde::Deserialize;

use crate::errors::ApiError;

/// Query parameters naming a bucket.
#[derive(Debug, Deserialize, Default)]
pub struct BucketQuery {
    pub bucket: Option<String>,
}

/// Query parameters naming an object.
#[derive(Debug, Deserialize, Default)]
pub struct ObjectQuery {
    pub bucket: Option<String>,
    #[serde(rename = "objectName")]
    pub object_name: Option<String>,
}

/// Returns the parameter value, rejecting absent or empty values.
pub(crate) fn required(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingParameter(name))
}
