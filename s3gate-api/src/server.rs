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

//! Axum HTTP server setup and routing.

use axum::{
    extract::DefaultBodyLimit,
    http::{header::HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use s3gate_core::{BucketManager, ObjectManager, StorageClient};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::errors::REQUEST_ID_HEADER;
use crate::handlers;
use crate::handlers::file::OMITTED_ENTRIES_HEADER;
use crate::middleware::{logging_middleware, metrics_middleware};

/// Default maximum upload size (5GB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024 * 1024;

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Bucket lifecycle operations.
    pub buckets: Arc<BucketManager>,
    /// Object transfer operations.
    pub objects: Arc<ObjectManager>,
    /// Maximum upload size in bytes.
    pub max_upload_size: usize,
    /// Prometheus metrics handle for rendering `/metrics` endpoint.
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Creates the state with both managers sharing one storage client.
    pub fn new(client: Arc<dyn StorageClient>) -> Self {
        Self {
            buckets: Arc::new(BucketManager::new(client.clone())),
            objects: Arc::new(ObjectManager::new(client)),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            prometheus_handle: None,
        }
    }

    /// Sets the maximum upload size.
    pub fn with_max_upload_size(mut self, max_upload_size: usize) -> Self {
        self.max_upload_size = max_upload_size;
        self
    }

    /// Sets the Prometheus handle for rendering metrics.
    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(handle);
        self
    }
}

/// Builds the cross-origin policy.
///
/// Any origin may call the gateway with credentials. Origin and request
/// headers are mirrored because wildcards are not allowed together with
/// credentials.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([
            HeaderName::from_static("token"),
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(OMITTED_ENTRIES_HEADER),
        ])
}

/// Creates the Axum router with all gateway routes.
pub fn create_router(state: AppState) -> Router {
    let gateway_router = Router::new()
        .route("/bucket/list", get(handlers::bucket::list_buckets))
        .route("/bucket/delete", get(handlers::bucket::delete_bucket))
        .route("/file/uploadfile", post(handlers::file::upload_file))
        .route("/file/list", get(handlers::file::list_files))
        .route("/file/download", get(handlers::file::download_file))
        .route("/file/delete", get(handlers::file::delete_file))
        .layer(cors_layer());

    Router::new()
        // Observability endpoints
        .route("/healthz", get(handlers::stats::healthz))
        .route("/metrics", get(handlers::stats::prometheus_metrics))
        .merge(gateway_router)
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        // Upload bodies are streamed, this only bounds their total size
        .layer(DefaultBodyLimit::max(state.max_upload_size))
        .with_state(state)
}
