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

//! Bucket operation handlers.
//!
//! - ListBuckets (GET /bucket/list)
//! - DeleteBucket (GET /bucket/delete?bucket=)

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use super::{required, BucketQuery};
use crate::errors::ApiError;
use crate::server::AppState;

/// Lists all buckets as a JSON array of names.
pub async fn list_buckets(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    debug!("ListBuckets");
    let buckets = state.buckets.list_buckets().await?;
    Ok(Json(buckets))
}

/// Deletes an empty bucket.
///
/// # Returns
///
/// - 200 OK with an empty body on success
/// - 404 Not Found if the bucket doesn't exist
/// - 400 Bad Request if the bucket still holds objects
pub async fn delete_bucket(
    State(state): State<AppState>,
    Query(query): Query<BucketQuery>,
) -> Result<StatusCode, ApiError> {
    let bucket = required(query.bucket, "bucket")?;
    info!("DeleteBucket: {}", bucket);

    state.buckets.delete_bucket(&bucket).await?;
    Ok(StatusCode::OK)
}
