use std::time::Duration;

use crate::error::{AppError, Result};

/// Probe connect timeout (seconds) when CONNECT_TIMEOUT is unset.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: f64 = 1.5;

/// Upper bound on concurrently in-flight probes per pass.
pub const DEFAULT_MAX_WORKERS: usize = 60;

/// Seconds between sample passes. The scheduler enforces a 1s sleep floor
/// regardless of this value, so a pass can never busy-loop.
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 60;

/// Fallback aggregation window (seconds) for malformed window specs.
pub const DEFAULT_WINDOW_SECS: i64 = 24 * 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    /// Host shared by every target in the configured port range (TARGET_HOST).
    pub target_host: String,
    /// Inclusive port range probed on `target_host` (START_PORT / END_PORT).
    pub start_port: u16,
    pub end_port: u16,
    /// Display ID assigned to the first port in the range (START_ID).
    pub start_id: u32,
    /// Positional user labels for the port range (USERS, comma-separated).
    /// Ports beyond the list length are labeled "-".
    pub users: Vec<String>,
    /// Extra targets outside the range: "host:port@label,host:port,..." (STATIC_TARGETS).
    pub static_targets: String,
    pub connect_timeout: Duration,
    pub max_workers: usize,
    pub sample_interval_secs: u64,
    pub db_backend: DbBackend,
    /// SQLite database file path (DB_PATH). Ignored for postgres.
    pub db_path: String,
    /// Postgres connection URL (DB_URL). Required when DB_BACKEND=postgres.
    pub db_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let start_port = std::env::var("START_PORT")
            .unwrap_or_else(|_| "50101".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::Config("START_PORT must be a valid port number".to_string()))?;
        let end_port = std::env::var("END_PORT")
            .unwrap_or_else(|_| "50200".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::Config("END_PORT must be a valid port number".to_string()))?;
        if end_port < start_port {
            return Err(AppError::Config(format!(
                "END_PORT ({end_port}) must not be below START_PORT ({start_port})"
            )));
        }

        let db_backend = match std::env::var("DB_BACKEND")
            .unwrap_or_else(|_| "sqlite".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => DbBackend::Sqlite,
            "postgres" => DbBackend::Postgres,
            other => {
                return Err(AppError::Config(format!(
                    "DB_BACKEND must be 'sqlite' or 'postgres', got '{other}'"
                )))
            }
        };

        let db_url = std::env::var("DB_URL").unwrap_or_default();
        if db_backend == DbBackend::Postgres && db_url.is_empty() {
            return Err(AppError::Config(
                "DB_URL is required when DB_BACKEND=postgres".to_string(),
            ));
        }

        let connect_timeout_secs = std::env::var("CONNECT_TIMEOUT")
            .unwrap_or_default()
            .parse::<f64>()
            .ok()
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            target_host: std::env::var("TARGET_HOST").unwrap_or_else(|_| "localhost".to_string()),
            start_port,
            end_port,
            start_id: std::env::var("START_ID")
                .unwrap_or_else(|_| "701".to_string())
                .parse::<u32>()
                .unwrap_or(701),
            users: std::env::var("USERS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            static_targets: std::env::var("STATIC_TARGETS").unwrap_or_default(),
            connect_timeout: Duration::from_secs_f64(connect_timeout_secs),
            max_workers: std::env::var("MAX_WORKERS")
                .unwrap_or_default()
                .parse::<usize>()
                .unwrap_or(DEFAULT_MAX_WORKERS)
                .max(1),
            sample_interval_secs: std::env::var("SAMPLE_INTERVAL_SEC")
                .unwrap_or_default()
                .parse::<u64>()
                .unwrap_or(DEFAULT_SAMPLE_INTERVAL_SECS)
                .max(1),
            db_backend,
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "portwatch.db".to_string()),
            db_url,
        })
    }
}
