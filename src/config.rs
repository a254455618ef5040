//! Downloader configuration.
//!
//! Every field has a default, so a JSON config file only needs the keys it
//! overrides. Durations are given in milliseconds.
//!
//! ```json
//! { "request_interval_ms": 2000, "retry": { "max_attempts": 5 } }
//! ```
use crate::retry::RetryPolicy;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    /// Page size for the country catalog.
    pub country_page_size: u32,
    /// Page size for the indicator catalog.
    pub indicator_page_size: u32,
    /// Page size for observation requests.
    pub data_page_size: u32,
    /// Page counts above this are treated as a malformed response.
    pub max_pages: u32,
    /// Total request timeout.
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Minimum gap between two consecutive outbound requests.
    pub request_interval_ms: u64,
    /// Minimum gap between the last request of one pair and the first of the next.
    pub pair_interval_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            country_page_size: 300,
            indicator_page_size: 1000,
            data_page_size: 1000,
            max_pages: 1000,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            request_interval_ms: 1_000,
            pair_interval_ms: 500,
            retry: RetryPolicy::default(),
        }
    }
}

impl DownloaderConfig {
    /// Load a JSON config file and validate it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&txt)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        if self.country_page_size == 0 || self.indicator_page_size == 0 || self.data_page_size == 0
        {
            bail!("page sizes must be greater than zero");
        }
        if self.max_pages == 0 {
            bail!("max_pages must be greater than zero");
        }
        self.retry.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn pair_interval(&self) -> Duration {
        Duration::from_millis(self.pair_interval_ms)
    }

    /// Config with no pacing and no backoff, for tests and mocks.
    pub fn without_delays() -> Self {
        Self {
            request_interval_ms: 0,
            pair_interval_ms: 0,
            retry: RetryPolicy {
                initial_backoff_ms: 0,
                max_backoff_ms: 0,
                ..RetryPolicy::default()
            },
            ..Self::default()
        }
    }
}
