//! Price provider trait and structured acquisition errors.
//!
//! Providers know nothing about caching or returns: they hand back an adjusted
//! close series per symbol and the acquisition layer does the rest.

use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One adjusted close observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub adj_close: f64,
}

/// Adjusted close series for a single symbol, sorted by date.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
    pub source: DataSource,
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

/// Errors raised before the core is invoked.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("import error: {0}")]
    Import(String),

    #[error("missing data for '{symbol}': {reason}")]
    MissingData { symbol: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Source of adjusted close series (Yahoo Finance, CSV/Parquet import, synthetic).
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Adjusted closes for `symbol` over `[start, end]`, both inclusive.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<PriceSeries, DataError>;

    /// Whether the provider currently accepts requests.
    fn is_available(&self) -> bool {
        true
    }
}
