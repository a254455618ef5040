//! Bulk orchestration: catalogs x catalogs through the paginated fetcher.
//!
//! Iteration is **country-major**: countries in catalog order form the outer
//! loop, indicators in catalog order the inner loop. A failing pair is logged
//! and recorded in [`DownloadReport::failures`]; the batch always runs to the end.
use crate::api::Downloader;
use crate::error::{CatalogFetchError, FetchError};
use crate::models::{CatalogKind, PairKey, ResultStore};
use log::{info, warn};
use std::collections::BTreeSet;

/// Outcome of a batch: what was fetched and what was not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadReport {
    pub store: ResultStore,
    pub failures: Vec<FetchError>,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold recovered pairs into an existing store; returns what still failed.
    pub fn merge_into(self, store: &mut ResultStore) -> Vec<FetchError> {
        store.extend(self.store);
        self.failures
    }
}

impl Downloader {
    /// Resolve both catalogs, then download every (country, indicator) pair.
    ///
    /// ### Errors
    /// Only catalog resolution is fatal. Per-pair failures end up in the report.
    pub fn download_all(&mut self) -> Result<DownloadReport, CatalogFetchError> {
        let countries = self.resolve(CatalogKind::Country)?;
        let indicators = self.resolve(CatalogKind::Indicator)?;
        info!(
            "downloading {} countries x {} indicators",
            countries.len(),
            indicators.len()
        );
        Ok(self.download_pairs(&countries, &indicators))
    }

    /// Download every indicator of the indicator catalog for a single country.
    pub fn download_country(&mut self, country: &str) -> Result<DownloadReport, CatalogFetchError> {
        let indicators = self.resolve(CatalogKind::Indicator)?;
        Ok(self.download_pairs(&[country.to_string()], &indicators))
    }

    /// Download the Cartesian product of the given catalogs, country-major.
    pub fn download_pairs(&mut self, countries: &[String], indicators: &[String]) -> DownloadReport {
        let total = countries.len() * indicators.len();
        let pairs = countries
            .iter()
            .flat_map(|c| indicators.iter().map(move |i| PairKey::new(c.as_str(), i.as_str())));
        self.run_pairs(pairs, total)
    }

    /// Re-fetch exactly the pairs that failed before, once each, in the given order.
    pub fn retry_failures(&mut self, failures: &[FetchError]) -> DownloadReport {
        let mut seen = BTreeSet::new();
        let pairs: Vec<PairKey> = failures
            .iter()
            .map(|f| PairKey::new(f.country.as_str(), f.indicator.as_str()))
            .filter(|k| seen.insert(k.clone()))
            .collect();
        let total = pairs.len();
        self.run_pairs(pairs, total)
    }

    fn run_pairs(&mut self, pairs: impl IntoIterator<Item = PairKey>, total: usize) -> DownloadReport {
        let mut report = DownloadReport::default();
        for (done, key) in pairs.into_iter().enumerate() {
            let progress = (done + 1) as f64 / total.max(1) as f64 * 100.0;
            info!(
                "progress {:.2}% ({}/{}) - fetching {} / {}",
                progress,
                done + 1,
                total,
                key.country,
                key.indicator
            );
            self.pacer.start_pair();
            match self.fetch(&key.country, &key.indicator) {
                Ok(rows) => {
                    report.store.insert(key, rows);
                }
                Err(e) => {
                    warn!("{}", e);
                    report.failures.push(e);
                }
            }
        }
        if !report.failures.is_empty() {
            warn!("{} of {} pairs failed", report.failures.len(), total);
        }
        report
    }
}
