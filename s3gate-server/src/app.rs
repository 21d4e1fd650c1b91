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

//! Application initialization and runtime.
//!
//! This module handles:
//! - Storage client construction
//! - HTTP server setup and routing
//! - TLS/HTTPS configuration
//! - Graceful shutdown

use crate::config::{BackendKind, Config};
use anyhow::{Context, Result};
use axum::ServiceExt;
use s3gate_api::{create_router, AppState};
use s3gate_core::{MemoryStorageClient, S3StorageClient, StorageClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::normalize_path::NormalizePath;
use tracing::{error, info, warn};

/// Main application.
pub struct App {
    config: Config,
    /// Backend handle shared by every request.
    client: Arc<dyn StorageClient>,
}

impl App {
    /// Creates a new application instance.
    ///
    /// Validates the configuration and builds the storage client.
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing s3gate application...");
        config.validate().context("invalid configuration")?;

        let client = build_client(&config)?;
        check_backend(client.as_ref()).await;

        Ok(Self { config, client })
    }

    /// Builds the application state from configuration.
    pub fn state(&self) -> AppState {
        AppState::new(self.client.clone()).with_max_upload_size(self.config.server.max_upload_size)
    }

    /// Runs the application (HTTP/HTTPS server) until a shutdown signal.
    pub async fn run(self) -> Result<()> {
        info!(
            "Max upload size: {} bytes ({:.2} GB)",
            self.config.server.max_upload_size,
            self.config.server.max_upload_size as f64 / (1024.0 * 1024.0 * 1024.0)
        );

        let addr: SocketAddr = self
            .config
            .server
            .bind
            .parse()
            .with_context(|| format!("invalid bind address {}", self.config.server.bind))?;

        let tls_config = if self.config.server.tls.enabled {
            Some(self.load_tls_config().await?)
        } else {
            None
        };

        let mut state = self.state();
        if self.config.metrics.prometheus_enabled {
            use metrics_exporter_prometheus::PrometheusBuilder;
            match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => {
                    info!("Prometheus metrics enabled (available at /metrics)");
                    state = state.with_prometheus_handle(handle);
                }
                Err(e) => {
                    warn!("Failed to install Prometheus recorder: {}. Metrics disabled.", e);
                }
            }
        } else {
            info!("Prometheus metrics disabled");
        }

        let router = create_router(state);

        if let Some(rustls_config) = tls_config {
            info!("Listening on https://{}", addr);
            run_https_server(addr, router, rustls_config).await
        } else {
            info!("Listening on http://{}", addr);
            run_http_server(addr, router).await
        }
    }

    /// Loads TLS configuration from certificate and key files.
    pub async fn load_tls_config(&self) -> Result<axum_server::tls_rustls::RustlsConfig> {
        use axum_server::tls_rustls::RustlsConfig;

        let tls_config = &self.config.server.tls;

        let cert_path =
            tls_config.cert_path.as_ref().context("TLS certificate path not configured")?;
        let key_path =
            tls_config.key_path.as_ref().context("TLS private key path not configured")?;

        info!("Loading TLS certificate from {:?}", cert_path);

        let rustls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .context("Failed to load TLS certificate and key")?;

        info!("TLS configured successfully");
        Ok(rustls_config)
    }
}

/// Builds the storage client selected by configuration.
pub fn build_client(config: &Config) -> Result<Arc<dyn StorageClient>> {
    match config.backend.kind {
        BackendKind::S3 => {
            let client = S3StorageClient::new(&config.backend.client_config())
                .context("Failed to create S3 client")?;
            Ok(Arc::new(client))
        }
        BackendKind::Memory => {
            warn!("Using in-memory backend: stored objects are lost on shutdown");
            Ok(Arc::new(MemoryStorageClient::new()))
        }
    }
}

/// Probes the backend once. A failure is logged but does not stop startup.
async fn check_backend(client: &dyn StorageClient) {
    match client.list_buckets().await {
        Ok(buckets) => info!("Storage backend reachable ({} buckets)", buckets.len()),
        Err(e) => warn!("Storage backend check failed: {}", e),
    }
}

/// Runs the HTTP server (without TLS).
async fn run_http_server(addr: SocketAddr, router: axum::Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let app = NormalizePath::trim_trailing_slash(router);

    axum::serve(
        listener,
        ServiceExt::<axum::http::Request<axum::body::Body>>::into_make_service(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Runs the HTTPS server (with TLS).
async fn run_https_server(
    addr: SocketAddr,
    router: axum::Router,
    rustls_config: axum_server::tls_rustls::RustlsConfig,
) -> Result<()> {
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(30)));
    });

    let app = NormalizePath::trim_trailing_slash(router);

    axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(ServiceExt::<axum::http::Request<axum::body::Body>>::into_make_service(app))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown...");
        }
    }
}
