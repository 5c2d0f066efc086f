//! Multi-symbol time alignment.
//!
//! Series are placed on the union of their dates. A symbol with no price on a
//! date gets NaN there; nothing is forward-filled.

use super::provider::PriceSeries;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Adjusted closes for several symbols on one date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPrices {
    /// Sorted ascending.
    pub dates: Vec<NaiveDate>,
    /// Input order.
    pub symbols: Vec<String>,
    /// One column per symbol, each `dates.len()` long.
    pub columns: Vec<Vec<f64>>,
}

impl AlignedPrices {
    pub fn has_gaps(&self, i: usize) -> bool {
        self.columns[i].iter().any(|v| v.is_nan())
    }
}

pub fn align_series(series: &[PriceSeries]) -> AlignedPrices {
    let dates: Vec<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let columns = series
        .iter()
        .map(|s| {
            let by_date: HashMap<NaiveDate, f64> =
                s.points.iter().map(|p| (p.date, p.adj_close)).collect();
            dates
                .iter()
                .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
                .collect()
        })
        .collect();

    AlignedPrices {
        dates,
        symbols: series.iter().map(|s| s.symbol.clone()).collect(),
        columns,
    }
}
