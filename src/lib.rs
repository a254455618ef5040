//! wbi_bulk
//!
//! Bulk downloader for the World Bank Indicators API. Resolves the full country
//! and indicator catalogs, fetches every page of every (country, indicator)
//! pair one request at a time, retries transient failures and keeps a minimum
//! gap between requests. Pairs with the `wbi-bulk` CLI.
//!
//! ### Features
//! - Paginated catalog resolution (countries, indicators)
//! - Paginated observation fetch with bounded exponential backoff on 429/5xx/network errors
//! - Request and pair pacing to stay under the API's rate limits
//! - Per-pair failure isolation: a batch returns its data plus the list of failed pairs
//! - JSON persistence of results and failures, tidy CSV export
//!
//! ### Example
//! ```no_run
//! use wbi_bulk::{Downloader, DownloaderConfig};
//!
//! let mut dl = Downloader::new(DownloaderConfig::default())?;
//! let report = dl.download_all()?;
//! wbi_bulk::storage::save_json(&report.store, "data/raw/world_bank_data.json")?;
//! wbi_bulk::storage::save_failures(&report.failures, "data/raw/failures.json")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod models;
pub mod pacing;
pub mod retry;
pub mod storage;
pub mod transport;

pub use api::Downloader;
pub use config::DownloaderConfig;
pub use download::DownloadReport;
pub use error::{CatalogFetchError, FetchError, RequestError};
pub use models::{CatalogKind, Observation, PairKey, ResultStore};
pub use retry::RetryPolicy;
