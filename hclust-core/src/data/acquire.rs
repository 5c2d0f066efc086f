//! Return acquisition: cache → provider → alignment → NA policy → returns.
//!
//! This is the only part of the workspace that blocks on I/O. Everything it
//! hands to the core is a finished, immutable [`ReturnTable`].

use super::align::align_series;
use super::cache::ReturnCache;
use super::provider::{DataError, DataSource, PriceProvider};
use crate::domain::{LabelSet, NaPolicy, ReturnTable};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which returns to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnRequest {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    /// `None` means "up to today".
    pub end: Option<NaiveDate>,
    pub na_policy: NaPolicy,
}

impl ReturnRequest {
    /// Symbols are trimmed and deduplicated, first occurrence wins.
    pub fn new(
        symbols: Vec<String>,
        start: NaiveDate,
        end: Option<NaiveDate>,
        na_policy: NaPolicy,
    ) -> Self {
        Self {
            symbols: LabelSet::dedup(symbols).to_vec(),
            start,
            end,
            na_policy,
        }
    }

    pub fn resolved_end(&self) -> NaiveDate {
        self.end
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// A loaded return table with provenance.
#[derive(Debug, Clone)]
pub struct LoadedReturns {
    pub table: Arc<ReturnTable>,
    /// Requested symbols left out, in request order.
    pub dropped: Vec<String>,
    pub sources: BTreeMap<String, DataSource>,
    /// BLAKE3 over symbols, dates, and prices.
    pub dataset_hash: String,
}

/// Load the return table for `req`, consulting `cache` first.
///
/// Under [`NaPolicy::DropSeries`] a symbol that fails to fetch, or whose aligned
/// prices have gaps, is dropped with a warning. Under
/// [`NaPolicy::PairwiseComplete`] a failed fetch is a `MissingData` error and
/// gaps are kept for the estimator to handle. A tripped circuit breaker always
/// aborts, and so does a provider that reports itself unavailable before a fetch.
///
/// The cache key is derived from the request with `K::from`; the default
/// [`ReturnKey`](super::cache::ReturnKey) ignores symbol order.
pub fn load_returns<K>(
    provider: &dyn PriceProvider,
    cache: &mut ReturnCache<K>,
    req: &ReturnRequest,
) -> Result<Arc<LoadedReturns>, DataError>
where
    K: for<'a> From<&'a ReturnRequest> + Eq + Hash,
{
    if req.symbols.is_empty() {
        return Err(DataError::InvalidRequest("no symbols requested".into()));
    }
    let end = req.resolved_end();
    if req.start > end {
        return Err(DataError::InvalidRequest(format!(
            "start {} is after end {end}",
            req.start
        )));
    }

    let key = K::from(req);
    if let Some(hit) = cache.get(&key) {
        debug!(symbols = req.symbols.len(), "return cache hit");
        return Ok(hit);
    }

    let total = req.symbols.len();
    let mut fetched = Vec::with_capacity(total);
    let mut dropped = Vec::new();
    let mut sources = BTreeMap::new();

    for (i, symbol) in req.symbols.iter().enumerate() {
        if !provider.is_available() {
            warn!(provider = provider.name(), symbol = %symbol, "provider unavailable, aborting load");
            return Err(DataError::CircuitBreakerTripped);
        }
        match provider.fetch(symbol, req.start, end) {
            Ok(series) => {
                info!(
                    provider = provider.name(),
                    symbol = %symbol,
                    points = series.points.len(),
                    progress = %format!("{}/{total}", i + 1),
                    "fetched prices"
                );
                sources.insert(symbol.clone(), series.source);
                fetched.push(series);
            }
            Err(DataError::CircuitBreakerTripped) => return Err(DataError::CircuitBreakerTripped),
            Err(e) => match req.na_policy {
                NaPolicy::DropSeries => {
                    warn!(symbol = %symbol, error = %e, "dropping symbol: fetch failed");
                    dropped.push(symbol.clone());
                }
                NaPolicy::PairwiseComplete => {
                    return Err(DataError::MissingData {
                        symbol: symbol.clone(),
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    let mut aligned = align_series(&fetched);

    if req.na_policy == NaPolicy::DropSeries {
        let keep: Vec<usize> = (0..aligned.symbols.len())
            .filter(|&i| !aligned.has_gaps(i))
            .collect();
        for (i, symbol) in aligned.symbols.iter().enumerate() {
            if !keep.contains(&i) {
                warn!(symbol = %symbol, "dropping symbol: price series has gaps");
                dropped.push(symbol.clone());
                sources.remove(symbol);
            }
        }
        aligned.symbols = keep.iter().map(|&i| aligned.symbols[i].clone()).collect();
        aligned.columns = keep.iter().map(|&i| aligned.columns[i].clone()).collect();
    }

    if aligned.symbols.is_empty() {
        return Err(DataError::MissingData {
            symbol: req.symbols.join(", "),
            reason: "no symbol has usable prices in the requested range".into(),
        });
    }

    // Report drops in request order regardless of why they were dropped.
    dropped.sort_by_key(|s| req.symbols.iter().position(|r| r == s));

    let dataset_hash = dataset_hash(&aligned.symbols, &aligned.dates, &aligned.columns);
    let labels = Arc::new(LabelSet::new(aligned.symbols.iter().cloned())?);
    let table = ReturnTable::from_prices(labels, &aligned.dates, &aligned.columns)?;

    info!(
        labels = table.labels().len(),
        dropped = dropped.len(),
        observations = table.observations(),
        "return table ready"
    );

    let loaded = Arc::new(LoadedReturns {
        table: Arc::new(table),
        dropped,
        sources,
        dataset_hash,
    });
    cache.insert(key, Arc::clone(&loaded));
    Ok(loaded)
}

/// Deterministic BLAKE3 hash over the aligned price data, in sorted symbol order.
fn dataset_hash(symbols: &[String], dates: &[NaiveDate], columns: &[Vec<f64>]) -> String {
    let mut order: Vec<usize> = (0..symbols.len()).collect();
    order.sort_by(|&a, &b| symbols[a].cmp(&symbols[b]));

    let mut hasher = blake3::Hasher::new();
    for date in dates {
        hasher.update(date.to_string().as_bytes());
    }
    for i in order {
        hasher.update(symbols[i].as_bytes());
        for value in &columns[i] {
            hasher.update(&value.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
