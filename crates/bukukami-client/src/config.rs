//! Foreground configuration loaded from environment variables.
//!
//! Wraps the [`WorkerConfig`] of the in-process worker so the API base URL
//! and the database path are configured once.

use std::time::Duration;

use bukukami_shared::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_REMINDER_INTERVAL_SECS, DEFAULT_VAPID_PUBLIC_KEY,
};
use bukukami_worker::WorkerConfig;
use url::Url;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub worker: WorkerConfig,

    /// VAPID public key of the story service (URL-safe base64).
    /// Env: `BUKUKAMI_VAPID_PUBLIC_KEY`
    pub vapid_public_key: String,

    /// Period of the "time to write" reminder.
    /// Env: `BUKUKAMI_REMINDER_INTERVAL_SECS`
    /// Default: 60 seconds.
    pub reminder_interval: Duration,

    /// Stories per feed page.
    /// Env: `BUKUKAMI_PAGE_SIZE`
    /// Default: 8
    pub page_size: u32,

    /// First outbox retry delay; doubles per consecutive failure.
    /// Env: `BUKUKAMI_RETRY_BASE_SECS`
    /// Default: 5 seconds.
    pub retry_base: Duration,

    /// Upper bound of the outbox retry delay.
    /// Env: `BUKUKAMI_RETRY_MAX_SECS`
    /// Default: 300 seconds.
    pub retry_max: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            vapid_public_key: DEFAULT_VAPID_PUBLIC_KEY.to_string(),
            reminder_interval: Duration::from_secs(DEFAULT_REMINDER_INTERVAL_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            retry_base: Duration::from_secs(5),
            retry_max: Duration::from_secs(300),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self {
            worker: WorkerConfig::from_env(),
            ..Self::default()
        };

        if let Ok(key) = std::env::var("BUKUKAMI_VAPID_PUBLIC_KEY") {
            if !key.trim().is_empty() {
                config.vapid_public_key = key.trim().to_string();
            }
        }

        if let Some(secs) = positive_secs("BUKUKAMI_REMINDER_INTERVAL_SECS") {
            config.reminder_interval = Duration::from_secs(secs);
        }

        if let Ok(raw) = std::env::var("BUKUKAMI_PAGE_SIZE") {
            match raw.parse::<u32>() {
                Ok(n) if n > 0 => config.page_size = n,
                _ => tracing::warn!(value = %raw, "Invalid BUKUKAMI_PAGE_SIZE, using default"),
            }
        }

        if let Some(secs) = positive_secs("BUKUKAMI_RETRY_BASE_SECS") {
            config.retry_base = Duration::from_secs(secs);
        }

        if let Some(secs) = positive_secs("BUKUKAMI_RETRY_MAX_SECS") {
            config.retry_max = Duration::from_secs(secs);
        }

        if config.retry_max < config.retry_base {
            tracing::warn!(
                base = ?config.retry_base,
                max = ?config.retry_max,
                "Retry max below base, clamping"
            );
            config.retry_max = config.retry_base;
        }

        config
    }

    pub fn api_base_url(&self) -> &Url {
        &self.worker.api_base_url
    }
}

fn positive_secs(var: &str) -> Option<u64> {
    let raw = std::env::var(var).ok()?;
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Some(secs),
        _ => {
            tracing::warn!(value = %raw, var, "Invalid duration, using default");
            None
        }
    }
}
