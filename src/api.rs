//! Synchronous client for the **World Bank Indicators API (v2)**.
//!
//! This module holds the two paginated readers of the pipeline:
//! - [`Downloader::resolve`] enumerates the country or indicator catalog.
//! - [`Downloader::fetch`] reads every page of `country/{c}/indicator/{i}`.
//!
//! Every request goes through the same path: wait on the [`Pacer`], send via the
//! [`Transport`], decode the `[meta, payload]` envelope, all wrapped in the
//! configured [`RetryPolicy`](crate::retry::RetryPolicy).
//!
//! ### Notes
//! - The API sometimes serializes `page`/`per_page` as **strings**; both are accepted.
//! - The page count is read from page 1 only and trusted for the rest of the pair.
//! - `pages = 0` means "no data", which is an empty result, not an error.
//!
//! Typical usage:
//! ```no_run
//! # use wbi_bulk::{Downloader, DownloaderConfig, CatalogKind};
//! let mut dl = Downloader::new(DownloaderConfig::default())?;
//! let countries = dl.resolve(CatalogKind::Country)?;
//! let rows = dl.fetch("AUS", "SP.POP.TOTL")?;
//! # Ok::<(), anyhow::Error>(())
//! ```
use crate::config::DownloaderConfig;
use crate::error::{CatalogFetchError, FetchError, RequestError};
use crate::models::{CatalogEntry, CatalogKind, Meta, Observation, PageEnvelope};
use crate::pacing::Pacer;
use crate::retry::Exhausted;
use crate::transport::{Clock, HttpTransport, SystemClock, Transport};
use anyhow::{Context, Result};
use log::{debug, info};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Sequential downloader. Owns the pacing state, so all requests go through `&mut self`.
pub struct Downloader {
    config: DownloaderConfig,
    transport: Box<dyn Transport>,
    clock: Box<dyn Clock>,
    pub(crate) pacer: Pacer,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .field("pacer", &self.pacer)
            .finish_non_exhaustive()
    }
}

// Allow -, _, . unescaped in codes (common for indicator ids)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc(code: &str) -> String {
    percent_encoding::utf8_percent_encode(code.trim(), SAFE).to_string()
}

/// A page that could not be read, and why.
struct PageFailure {
    page: u32,
    exhausted: Exhausted,
}

/// Decode one `[meta, payload]` envelope.
///
/// A `null` payload is an empty page. A missing payload is tolerated only when
/// the metadata reports zero pages.
pub fn parse_envelope<T: DeserializeOwned>(v: Value) -> Result<PageEnvelope<T>, RequestError> {
    let Value::Array(arr) = v else {
        return Err(RequestError::Malformed(
            "unexpected response shape: not a top-level array".into(),
        ));
    };
    let mut parts = arr.into_iter();
    let head = parts
        .next()
        .ok_or_else(|| RequestError::Malformed("unexpected response: empty array".into()))?;

    // If first element has "message", surface API error.
    if let Some(msg) = head.get("message") {
        return Err(RequestError::Api(msg.to_string()));
    }

    let meta: Meta = serde_json::from_value(head)
        .map_err(|e| RequestError::Malformed(format!("pagination metadata: {}", e)))?;
    let items = match parts.next() {
        Some(Value::Null) => Vec::new(),
        Some(payload) => serde_json::from_value(payload)
            .map_err(|e| RequestError::Malformed(format!("payload: {}", e)))?,
        None if meta.pages == 0 => Vec::new(),
        None => return Err(RequestError::Malformed("missing payload list".into())),
    };
    Ok(PageEnvelope { meta, items })
}

impl Downloader {
    /// Build a downloader against the live API.
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config).context("build http client")?;
        Ok(Self::with_parts(config, Box::new(transport), Box::new(SystemClock)))
    }

    /// Build a downloader from an explicit transport and clock.
    pub fn with_parts(
        config: DownloaderConfig,
        transport: Box<dyn Transport>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let pacer = Pacer::new(config.request_interval(), config.pair_interval());
        Self {
            config,
            transport,
            clock,
            pacer,
        }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// One paced, retried request for one page.
    ///
    /// The pacing gap starts when a request completes, whatever its outcome,
    /// and restarts after a retry backoff, so a retry waits the backoff and then
    /// the full pacing gap.
    fn get_page<T: DeserializeOwned>(&mut self, url: &str) -> Result<PageEnvelope<T>, Exhausted> {
        let transport = &self.transport;
        let pacer = &mut self.pacer;
        let clock = self.clock.as_ref();
        self.config.retry.run(clock, |attempt| {
            if attempt > 1 {
                pacer.stamp(clock);
            }
            pacer.wait(clock);
            debug!("GET {} (attempt {})", url, attempt);
            let res = transport.get_json(url);
            pacer.stamp(clock);
            parse_envelope(res?)
        })
    }

    /// Read page 1, then pages 2..=pages in order, concatenating payloads.
    fn collect_pages<T: DeserializeOwned>(&mut self, url: &str) -> Result<Vec<T>, PageFailure> {
        let page_url = |page: u32| format!("{}&page={}", url, page);

        let first = self
            .get_page::<T>(&page_url(1))
            .map_err(|exhausted| PageFailure { page: 1, exhausted })?;
        let total_pages = first.meta.pages;
        if total_pages == 0 {
            return Ok(Vec::new());
        }
        // Safety cap to avoid pathological jobs
        if total_pages > self.config.max_pages {
            return Err(PageFailure {
                page: 1,
                exhausted: Exhausted {
                    attempts: 1,
                    cause: RequestError::Malformed(format!(
                        "page count {} exceeds limit {}",
                        total_pages, self.config.max_pages
                    )),
                },
            });
        }

        let mut out = first.items;
        for page in 2..=total_pages {
            let env = self
                .get_page::<T>(&page_url(page))
                .map_err(|exhausted| PageFailure { page, exhausted })?;
            out.extend(env.items);
        }
        Ok(out)
    }

    /// Enumerate every code of one catalog, in API order.
    ///
    /// Any page that cannot be read fails the whole resolution; no partial
    /// catalog is returned.
    pub fn resolve(&mut self, kind: CatalogKind) -> Result<Vec<String>, CatalogFetchError> {
        let per_page = match kind {
            CatalogKind::Country => self.config.country_page_size,
            CatalogKind::Indicator => self.config.indicator_page_size,
        };
        let url = format!(
            "{}/{}?format=json&per_page={}",
            self.config.base_url,
            kind.path(),
            per_page
        );
        let entries: Vec<CatalogEntry> = self.collect_pages(&url).map_err(
            |PageFailure { page, exhausted }| CatalogFetchError {
                kind,
                page,
                attempts: exhausted.attempts,
                cause: exhausted.cause,
            },
        )?;
        let codes: Vec<String> = entries.into_iter().map(|e| e.id).collect();
        info!("resolved {} catalog: {} codes", kind, codes.len());
        Ok(codes)
    }

    /// Fetch every observation for one (country, indicator) pair.
    ///
    /// ### Errors
    /// [`FetchError`] naming the page that failed, once the retry budget is
    /// spent or a terminal error (non-429 4xx, API error, malformed body) is hit.
    pub fn fetch(&mut self, country: &str, indicator: &str) -> Result<Vec<Observation>, FetchError> {
        let url = format!(
            "{}/country/{}/indicator/{}?format=json&per_page={}",
            self.config.base_url,
            enc(country),
            enc(indicator),
            self.config.data_page_size
        );
        let rows = self
            .collect_pages(&url)
            .map_err(|PageFailure { page, exhausted }| FetchError {
                country: country.to_string(),
                indicator: indicator.to_string(),
                page,
                attempts: exhausted.attempts,
                cause: exhausted.cause,
            })?;
        debug!("{}/{}: {} observations", country, indicator, rows.len());
        Ok(rows)
    }
}
