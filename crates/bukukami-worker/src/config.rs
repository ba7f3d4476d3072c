//! Worker configuration loaded from environment variables.
//!
//! All settings have defaults so the worker can start with zero
//! configuration against the public story service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use bukukami_shared::constants::{
    API_CACHE_NAME, DEFAULT_API_BASE_URL, STATIC_ASSETS, STATIC_CACHE_NAME,
};
use url::{Origin, Url};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the remote story service. Requests to its origin are API
    /// requests.
    /// Env: `BUKUKAMI_API_BASE_URL`
    pub api_base_url: Url,

    /// Origin the static application assets are served from.
    /// Env: `BUKUKAMI_STATIC_ORIGIN`
    /// Default: `http://127.0.0.1:9000/`
    pub static_origin: Url,

    /// Socket address of the reverse proxy.
    /// Env: `BUKUKAMI_LISTEN_ADDR`
    /// Default: `127.0.0.1:8787`
    pub listen_addr: SocketAddr,

    /// Path prefix the proxy maps onto the API base URL.
    /// Env: `BUKUKAMI_API_PREFIX`
    /// Default: `/api`
    pub api_prefix: String,

    /// Database file. `None` uses the platform data directory.
    /// Env: `BUKUKAMI_DB_PATH`
    pub db_path: Option<PathBuf>,

    /// Per-request network timeout.
    /// Env: `BUKUKAMI_REQUEST_TIMEOUT_SECS`
    /// Default: 30 seconds.
    pub request_timeout: Duration,

    pub static_cache_name: String,
    pub api_cache_name: String,

    /// Paths fetched into the static cache on install, relative to
    /// `static_origin`.
    pub static_assets: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            api_base_url: parse_default(DEFAULT_API_BASE_URL),
            static_origin: parse_default("http://127.0.0.1:9000/"),
            listen_addr: ([127, 0, 0, 1], 8787).into(),
            api_prefix: "/api".to_string(),
            db_path: None,
            request_timeout: Duration::from_secs(30),
            static_cache_name: STATIC_CACHE_NAME.to_string(),
            api_cache_name: API_CACHE_NAME.to_string(),
            static_assets: STATIC_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("BUKUKAMI_API_BASE_URL") {
            match Url::parse(&raw) {
                Ok(url) => config.api_base_url = url,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Invalid BUKUKAMI_API_BASE_URL, using default"),
            }
        }

        if let Ok(raw) = std::env::var("BUKUKAMI_STATIC_ORIGIN") {
            match Url::parse(&raw) {
                Ok(url) => config.static_origin = url,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Invalid BUKUKAMI_STATIC_ORIGIN, using default"),
            }
        }

        if let Ok(raw) = std::env::var("BUKUKAMI_LISTEN_ADDR") {
            if let Ok(parsed) = raw.parse::<SocketAddr>() {
                config.listen_addr = parsed;
            } else {
                tracing::warn!(value = %raw, "Invalid BUKUKAMI_LISTEN_ADDR, using default");
            }
        }

        if let Ok(prefix) = std::env::var("BUKUKAMI_API_PREFIX") {
            if prefix.starts_with('/') && prefix.len() > 1 {
                config.api_prefix = prefix.trim_end_matches('/').to_string();
            } else {
                tracing::warn!(value = %prefix, "Invalid BUKUKAMI_API_PREFIX, using default");
            }
        }

        if let Ok(path) = std::env::var("BUKUKAMI_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(raw) = std::env::var("BUKUKAMI_REQUEST_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "Invalid BUKUKAMI_REQUEST_TIMEOUT_SECS, using default"),
            }
        }

        config
    }

    pub fn api_origin(&self) -> Origin {
        self.api_base_url.origin()
    }

    /// Cache generations that survive activation.
    pub fn current_caches(&self) -> [&str; 2] {
        [&self.static_cache_name, &self.api_cache_name]
    }
}

fn parse_default(raw: &str) -> Url {
    Url::parse(raw).expect("valid built-in URL")
}
