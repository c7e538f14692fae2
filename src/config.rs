// src/config.rs

//! Startup configuration for both binaries, read from environment variables.
//!
//! Values are validated eagerly. A variable that is present but malformed is
//! a deployment error and aborts startup instead of silently falling back to
//! its default.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads an optional environment variable as a string.
///
/// Unset and empty values both yield `None`.
macro_rules! optional_env {
    // ---
    ($key:literal) => {
        std::env::var($key).ok().filter(|v| !v.is_empty())
    };
}

/// Reads an optional environment variable and parses it.
///
/// A missing variable yields the default. A variable that fails to parse is
/// a configuration error naming the key and the offending value.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        match std::env::var($key) {
            Ok(raw) => raw.trim().parse::<$ty>().map_err(|err| {
                anyhow::anyhow!(concat!("Invalid configuration: ", $key, "={:?} ({})"), raw, err)
            })?,
            Err(_) => $default,
        }
    };
}

#[cfg(test)]
/// Asserts that a configuration constructor rejects the given key.
macro_rules! assert_invalid_config {
    // ---
    ($expr:expr, $key:literal) => {{
        let err = $expr.expect_err("expected configuration error");
        assert!(
            err.to_string()
                .contains(concat!("Invalid configuration: ", $key)),
            "unexpected error: {err}"
        );
    }};
}

// ============================================================
// Server configuration
// ============================================================

/// Which telemetry recorder backs `GET /metrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryExporter {
    Noop,
    Prometheus,
}

impl std::str::FromStr for TelemetryExporter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "noop" | "" => Ok(Self::Noop),
            "prom" => Ok(Self::Prometheus),
            other => Err(format!("expected `noop` or `prom`, got `{other}`")),
        }
    }
}

/// Collector server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address. Defaults to `0.0.0.0:8080`.
    pub address: String,

    /// Minimum time between saver runs. Zero saves after every update.
    pub store_interval: Duration,

    /// Snapshot file; `None` disables the saver.
    pub file_storage_path: Option<PathBuf>,

    /// Replay the snapshot file at startup.
    pub restore: bool,

    /// Selects the PostgreSQL backend.
    pub database_dsn: Option<String>,

    /// Selects the Redis backend when no DSN is set.
    pub redis_url: Option<String>,

    /// HMAC key; `None` disables signing.
    pub key: Option<String>,

    pub exporter: TelemetryExporter,
}

impl ServerConfig {
    /// Builds a [`ServerConfig`] from environment variables.
    ///
    /// # Errors
    /// Returns an error if any variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        // ---
        let address = optional_env!("ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let store_interval_secs = optional_env_parse!("STORE_INTERVAL", u64, 300);
        let restore = optional_env_parse!("RESTORE", bool, true);
        let exporter = optional_env_parse!("METRICS_EXPORTER", TelemetryExporter, TelemetryExporter::Noop);

        // Unset falls back to the default path; set-but-empty disables saving.
        let file_storage_path = match std::env::var("FILE_STORAGE_PATH") {
            Ok(path) if path.is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => Some(PathBuf::from("/tmp/metrics-db.json")),
        };

        Ok(Self {
            address,
            store_interval: Duration::from_secs(store_interval_secs),
            file_storage_path,
            restore,
            database_dsn: optional_env!("DATABASE_DSN"),
            redis_url: optional_env!("REDIS_URL"),
            key: optional_env!("KEY"),
            exporter,
        })
    }
}

// ============================================================
// Agent configuration
// ============================================================

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Server `host:port`. Defaults to `localhost:8080`.
    pub address: String,

    pub poll_interval: Duration,

    pub report_interval: Duration,

    /// HMAC key; `None` disables signing.
    pub key: Option<String>,

    /// Number of delivery workers.
    pub rate_limit: usize,
}

impl AgentConfig {
    /// Builds an [`AgentConfig`] from environment variables.
    ///
    /// # Errors
    /// Returns an error if any variable is malformed or an interval or the
    /// worker count is zero.
    pub fn from_env() -> Result<Self> {
        // ---
        let address = optional_env!("ADDRESS").unwrap_or_else(|| "localhost:8080".to_string());
        let poll_secs = optional_env_parse!("POLL_INTERVAL", u64, 2);
        let report_secs = optional_env_parse!("REPORT_INTERVAL", u64, 10);
        let rate_limit = optional_env_parse!("RATE_LIMIT", usize, 1);

        anyhow::ensure!(poll_secs > 0, "Invalid configuration: POLL_INTERVAL must be positive");
        anyhow::ensure!(report_secs > 0, "Invalid configuration: REPORT_INTERVAL must be positive");
        anyhow::ensure!(rate_limit > 0, "Invalid configuration: RATE_LIMIT must be positive");

        Ok(Self {
            address,
            poll_interval: Duration::from_secs(poll_secs),
            report_interval: Duration::from_secs(report_secs),
            key: optional_env!("KEY"),
            rate_limit,
        })
    }
}

// ============================================================
// Tests
// ============================================================
