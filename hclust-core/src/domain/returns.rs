//! Return-series table: one column per label on a common date axis.
//!
//! Missing observations are strict NaN. No forward-fill.

use super::labels::LabelSet;
use crate::error::{CoreError, Stage};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do with labels whose series have gaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NaPolicy {
    /// Drop every label whose price series has any missing value.
    #[default]
    DropSeries,
    /// Keep every label; correlations use pairwise-complete observations.
    PairwiseComplete,
}

impl NaPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            NaPolicy::DropSeries => "drop_series",
            NaPolicy::PairwiseComplete => "pairwise_complete",
        }
    }
}

impl std::fmt::Display for NaPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NaPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "drop_series" | "drop" => Ok(NaPolicy::DropSeries),
            "pairwise_complete" | "pairwise" => Ok(NaPolicy::PairwiseComplete),
            other => Err(format!(
                "unknown NA policy '{other}' (expected drop_series or pairwise_complete)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTable {
    labels: Arc<LabelSet>,
    dates: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl ReturnTable {
    /// Build a table from per-label columns. Every column must have one value per date.
    pub fn new(
        labels: Arc<LabelSet>,
        dates: Vec<NaiveDate>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, CoreError> {
        if columns.len() != labels.len() {
            return Err(CoreError::invalid_input(
                Stage::Correlation,
                format!("{} columns for {} labels", columns.len(), labels.len()),
            ));
        }
        for (label, column) in labels.iter().zip(&columns) {
            if column.len() != dates.len() {
                return Err(CoreError::invalid_input(
                    Stage::Correlation,
                    format!(
                        "column '{label}' has {} observations, expected {}",
                        column.len(),
                        dates.len()
                    ),
                ));
            }
        }
        Ok(Self {
            labels,
            dates,
            columns,
        })
    }

    /// Simple returns `p[t] / p[t-1] - 1` from aligned price columns.
    ///
    /// The first date is consumed. A return is NaN when either price is missing.
    pub fn from_prices(
        labels: Arc<LabelSet>,
        dates: &[NaiveDate],
        prices: &[Vec<f64>],
    ) -> Result<Self, CoreError> {
        let return_dates = dates.iter().skip(1).copied().collect();
        let columns = prices
            .iter()
            .map(|series| {
                series
                    .windows(2)
                    .map(|w| {
                        if w[0].is_nan() || w[1].is_nan() || w[0] == 0.0 {
                            f64::NAN
                        } else {
                            w[1] / w[0] - 1.0
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(labels, return_dates, columns)
    }

    pub fn labels(&self) -> &Arc<LabelSet> {
        &self.labels
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn observations(&self) -> usize {
        self.dates.len()
    }

    pub fn column(&self, i: usize) -> &[f64] {
        &self.columns[i]
    }

    pub fn column_by_label(&self, label: &str) -> Option<&[f64]> {
        self.labels.index_of(label).map(|i| self.column(i))
    }

    pub fn missing_count(&self, i: usize) -> usize {
        self.columns[i].iter().filter(|v| v.is_nan()).count()
    }

    /// Restrict the table to the labels at the given positions.
    pub fn select(&self, positions: &[usize]) -> Result<Self, CoreError> {
        let labels = Arc::new(self.labels.select(positions)?);
        let columns = positions.iter().map(|&i| self.columns[i].clone()).collect();
        Self::new(labels, self.dates.clone(), columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn simple_returns_from_prices() {
        let labels = Arc::new(LabelSet::new(["SPY", "QQQ"]).unwrap());
        let dates = [d(2), d(3), d(4)];
        let prices = vec![vec![100.0, 110.0, 99.0], vec![50.0, f64::NAN, 55.0]];
        let table = ReturnTable::from_prices(labels, &dates, &prices).unwrap();

        assert_eq!(table.dates(), &[d(3), d(4)]);
        let spy = table.column_by_label("SPY").unwrap();
        assert!((spy[0] - 0.1).abs() < 1e-12);
        assert!((spy[1] + 0.1).abs() < 1e-12);
        assert_eq!(table.missing_count(1), 2);
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let labels = Arc::new(LabelSet::new(["SPY"]).unwrap());
        let err = ReturnTable::new(labels, vec![d(2), d(3)], vec![vec![0.01]]).unwrap_err();
        assert!(err.to_string().contains("'SPY' has 1 observations"));
    }

    #[test]
    fn select_subset() {
        let labels = Arc::new(LabelSet::new(["A", "B", "C"]).unwrap());
        let table = ReturnTable::new(
            labels,
            vec![d(2)],
            vec![vec![0.1], vec![0.2], vec![0.3]],
        )
        .unwrap();
        let sub = table.select(&[2, 0]).unwrap();
        assert_eq!(sub.labels().as_slice(), &["C", "A"]);
        assert_eq!(sub.column(0), &[0.3]);
    }

    #[test]
    fn na_policy_serde_names() {
        let json = serde_json::to_string(&NaPolicy::PairwiseComplete).unwrap();
        assert_eq!(json, "\"pairwise_complete\"");
        assert_eq!(NaPolicy::default(), NaPolicy::DropSeries);
    }

    #[test]
    fn na_policy_parses_cli_spellings() {
        assert_eq!("pairwise-complete".parse::<NaPolicy>(), Ok(NaPolicy::PairwiseComplete));
        assert_eq!("DROP".parse::<NaPolicy>(), Ok(NaPolicy::DropSeries));
        assert!("ffill".parse::<NaPolicy>().is_err());
        assert_eq!(NaPolicy::DropSeries.to_string(), "drop_series");
    }
}
