//! Error taxonomy for the download pipeline.
//!
//! Three layers:
//! - [`RequestError`]: outcome of one HTTP request. Classified as transient or terminal.
//! - [`FetchError`]: one (country, indicator) pair gave up. Recorded, never fatal to a batch.
//! - [`CatalogFetchError`]: country or indicator catalog could not be resolved. Fatal.
use crate::models::CatalogKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single GET against the API.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RequestError {
    /// Timeout, connection failure or a body that could not be read.
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status.
    #[error("request failed with HTTP {0}")]
    Status(u16),
    /// The API answered with an error envelope (`[{"message": ...}]`).
    #[error("world bank api error: {0}")]
    Api(String),
    /// The body did not have the expected `[meta, payload]` shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RequestError {
    /// Whether retrying the same request may succeed.
    ///
    /// Network errors, HTTP 429 and HTTP 5xx are transient. Every other status,
    /// API error envelopes and schema mismatches are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            RequestError::Network(_) => true,
            RequestError::Status(code) => *code == 429 || (500..600).contains(code),
            RequestError::Api(_) | RequestError::Malformed(_) => false,
        }
    }
}

/// Terminal failure for one pair after the retry budget was spent (or a terminal error hit).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("fetch failed for {country}/{indicator} at page {page} after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    pub country: String,
    pub indicator: String,
    pub page: u32,
    pub attempts: u32,
    pub cause: RequestError,
}

/// Terminal failure resolving a catalog. Aborts the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to resolve {kind} catalog at page {page} after {attempts} attempt(s): {cause}")]
pub struct CatalogFetchError {
    pub kind: CatalogKind,
    pub page: u32,
    pub attempts: u32,
    pub cause: RequestError,
}
