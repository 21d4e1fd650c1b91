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

//! Configuration management for the s3gate server.
//!
//! Every setting has a default and can be overridden by an `S3GATE_*`
//! environment variable.

use s3gate_core::{BackendConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default maximum upload size (5GB).
const DEFAULT_MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024 * 1024;

/// Configuration errors detected at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    /// Only one of the TLS certificate and key is configured.
    #[error("TLS enabled but {0} is not set")]
    IncompleteTls(&'static str),

    /// An S3 backend was selected without credentials.
    #[error("S3 backend requires {0}")]
    MissingCredentials(&'static str),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings (bind address, TLS, etc.)
    pub server: ServerConfig,
    /// Storage backend connection
    pub backend: BackendSettings,
    /// Metrics and monitoring configuration
    pub metrics: MetricsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind: String,
    /// Maximum upload size in bytes.
    /// Can be set via S3GATE_MAX_UPLOAD_SIZE (e.g., "5GB", "100MB", "1024KB").
    pub max_upload_size: usize,
    /// TLS configuration for HTTPS support.
    pub tls: TlsConfig,
}

/// TLS/HTTPS configuration.
///
/// TLS is disabled by default. To enable TLS, set `S3GATE_TLS_CERT` and
/// `S3GATE_TLS_KEY` to PEM-encoded certificate and private key files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Whether TLS is enabled.
    /// Set when either path is provided; `validate` requires both.
    pub enabled: bool,
    /// Path to PEM-encoded certificate file.
    pub cert_path: Option<PathBuf>,
    /// Path to PEM-encoded private key file.
    pub key_path: Option<PathBuf>,
}

impl TlsConfig {
    /// Returns an error if TLS is enabled but certificate or key paths are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled {
            if self.cert_path.is_none() {
                return Err(ConfigError::IncompleteTls("S3GATE_TLS_CERT"));
            }
            if self.key_path.is_none() {
                return Err(ConfigError::IncompleteTls("S3GATE_TLS_KEY"));
            }
        }
        Ok(())
    }
}

/// Which storage client implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Any S3-compatible server.
    S3,
    /// In-process store; data is lost on exit.
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(BackendKind::S3),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{}' (expected s3 or memory)", other)),
        }
    }
}

/// Storage backend settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    pub kind: BackendKind,
    /// Custom endpoint URL, e.g. `http://minio:9000`.
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    /// Path-style addressing, needed by most self-hosted stores.
    pub force_path_style: bool,
    /// Total attempts for idempotent backend requests (1 disables retries).
    pub max_attempts: u32,
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("force_path_style", &self.force_path_style)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl BackendSettings {
    /// Converts to the storage client configuration.
    pub fn client_config(&self) -> BackendConfig {
        BackendConfig {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            force_path_style: self.force_path_style,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                ..RetryPolicy::default()
            },
            ..BackendConfig::default()
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics
    pub prometheus_enabled: bool,
}

/// Parses a size string like "10GB", "100MB", "1024KB", "5000" into bytes.
///
/// Supported suffixes (case-insensitive):
/// - GB, G: Gigabytes
/// - MB, M: Megabytes
/// - KB, K: Kilobytes
/// - B or no suffix: Bytes
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim().to_uppercase();

    if s.is_empty() {
        return Err("Empty size string".to_string());
    }

    let num_end = s.chars().position(|c| !c.is_ascii_digit() && c != '.').unwrap_or(s.len());
    let (num_str, suffix) = s.split_at(num_end);

    let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {}", num_str))?;

    let multiplier: usize = match suffix.trim() {
        "GB" | "G" => 1024 * 1024 * 1024,
        "MB" | "M" => 1024 * 1024,
        "KB" | "K" => 1024,
        "B" | "" => 1,
        other => return Err(format!("Unknown size suffix: {}", other)),
    };

    Ok((num * multiplier as f64) as usize)
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(format!("expected true or false, got '{}'", other)),
    }
}

/// Reads and parses one variable, keeping `default` when it is unset.
fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => parse(&value).map_err(|reason| ConfigError::InvalidValue { var, reason }),
        None => Ok(default),
    }
}

impl Config {
    /// Loads and validates configuration from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::from_lookup(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Builds configuration from a variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let cert_path = lookup("S3GATE_TLS_CERT").map(PathBuf::from);
        let key_path = lookup("S3GATE_TLS_KEY").map(PathBuf::from);

        let max_attempts = parsed(&lookup, "S3GATE_MAX_RETRIES", 3, |s| {
            match s.trim().parse::<u32>() {
                Ok(0) => Err("must be at least 1".to_string()),
                Ok(n) => Ok(n),
                Err(e) => Err(e.to_string()),
            }
        })?;

        Ok(Self {
            server: ServerConfig {
                bind: lookup("S3GATE_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
                max_upload_size: parsed(
                    &lookup,
                    "S3GATE_MAX_UPLOAD_SIZE",
                    DEFAULT_MAX_UPLOAD_SIZE,
                    parse_size,
                )?,
                tls: TlsConfig {
                    enabled: cert_path.is_some() || key_path.is_some(),
                    cert_path,
                    key_path,
                },
            },
            backend: BackendSettings {
                kind: parsed(&lookup, "S3GATE_BACKEND", BackendKind::S3, BackendKind::from_str)?,
                endpoint: lookup("S3GATE_ENDPOINT").filter(|s| !s.is_empty()),
                region: lookup("S3GATE_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key: lookup("S3GATE_ACCESS_KEY").unwrap_or_default(),
                secret_key: lookup("S3GATE_SECRET_KEY").unwrap_or_default(),
                force_path_style: parsed(&lookup, "S3GATE_FORCE_PATH_STYLE", true, parse_bool)?,
                max_attempts,
            },
            metrics: MetricsConfig {
                prometheus_enabled: parsed(&lookup, "S3GATE_METRICS_ENABLED", true, parse_bool)?,
            },
        })
    }

    /// Checks settings that cannot work together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.tls.validate()?;

        if self.backend.kind == BackendKind::S3 {
            if self.backend.access_key.is_empty() {
                return Err(ConfigError::MissingCredentials("S3GATE_ACCESS_KEY"));
            }
            if self.backend.secret_key.is_empty() {
                return Err(ConfigError::MissingCredentials("S3GATE_SECRET_KEY"));
            }
        }
        Ok(())
    }
}
