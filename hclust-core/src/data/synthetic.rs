//! Seeded synthetic prices with a sector factor structure.
//!
//! Each weekday draws one market shock and one shock per sector from an RNG
//! keyed on `(seed, date)`, so every symbol fetched separately still sees the
//! same factors. Symbols in the same sector therefore correlate strongly and
//! the resulting hierarchy is known in advance.

use super::provider::{DataError, DataSource, PricePoint, PriceProvider, PriceSeries};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const MARKET_WEIGHT: f64 = 0.3;
const SECTOR_WEIGHT: f64 = 0.6;
const IDIOSYNCRATIC_WEIGHT: f64 = 0.25;
const SHOCK: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    sectors: usize,
    assignment: HashMap<String, usize>,
}

impl SyntheticProvider {
    /// Three sectors; symbols are hashed onto them.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            sectors: 3,
            assignment: HashMap::new(),
        }
    }

    pub fn with_sectors(mut self, sectors: usize) -> Self {
        self.sectors = sectors.max(1);
        self
    }

    /// Pin a symbol to a sector instead of hashing it.
    pub fn assign(mut self, symbol: impl Into<String>, sector: usize) -> Self {
        self.sectors = self.sectors.max(sector + 1);
        self.assignment.insert(symbol.into(), sector);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn sector_of(&self, symbol: &str) -> usize {
        if let Some(&sector) = self.assignment.get(symbol) {
            return sector;
        }
        let hash = blake3::hash(symbol.as_bytes());
        let bytes = hash.as_bytes();
        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes[..8]);
        (u64::from_le_bytes(head) % self.sectors as u64) as usize
    }

    fn rng_for(&self, tag: &[u8]) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(tag);
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// `(market, sector)` shocks for one date.
    fn factors(&self, date: NaiveDate, sector: usize) -> (f64, f64) {
        let mut rng = self.rng_for(date.to_string().as_bytes());
        let market = rng.gen_range(-SHOCK..SHOCK);
        let sector_shock = (0..=sector)
            .map(|_| rng.gen_range(-SHOCK..SHOCK))
            .last()
            .unwrap_or(0.0);
        (market, sector_shock)
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        if symbol.trim().is_empty() {
            return Err(DataError::InvalidRequest("blank symbol".into()));
        }
        if start > end {
            return Err(DataError::InvalidRequest(format!(
                "start {start} is after end {end}"
            )));
        }

        let sector = self.sector_of(symbol);
        let mut idio = self.rng_for(symbol.as_bytes());
        let mut price = 100.0_f64;
        let mut points = Vec::new();

        let mut current = start;
        while current <= end {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                let (market, sector_shock) = self.factors(current, sector);
                let noise: f64 = idio.gen_range(-SHOCK..SHOCK);
                let ret = MARKET_WEIGHT * market
                    + SECTOR_WEIGHT * sector_shock
                    + IDIOSYNCRATIC_WEIGHT * noise;
                price *= 1.0 + ret;
                points.push(PricePoint {
                    date: current,
                    adj_close: price,
                });
            }
            current += chrono::Duration::days(1);
        }

        if points.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: format!("no trading days between {start} and {end}"),
            });
        }

        Ok(PriceSeries {
            symbol: symbol.to_string(),
            points,
            source: DataSource::Synthetic,
        })
    }
}
