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

//! s3gate API Layer - HTTP gateway in front of an S3-compatible store
//!
//! This crate provides:
//! - `/bucket/*` and `/file/*` endpoints
//! - Backend error to HTTP status translation
//! - CORS, logging and metrics middleware

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use errors::ApiError;
pub use server::{create_router, AppState, DEFAULT_MAX_UPLOAD_SIZE};
