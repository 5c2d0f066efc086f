//! Price import from a local wide table.
//!
//! One `date` column (ISO `YYYY-MM-DD`) plus one adjusted-close column per
//! symbol. CSV and Parquet are both read through Polars; empty cells become
//! gaps in the symbol's series.

use super::provider::{DataError, DataSource, PricePoint, PriceProvider, PriceSeries};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const DATE_COLUMN: &str = "date";

pub struct CsvPriceProvider {
    path: PathBuf,
    series: HashMap<String, Vec<PricePoint>>,
    symbols: Vec<String>,
}

impl CsvPriceProvider {
    /// Load the whole table up front. `.parquet` files use the Parquet reader,
    /// anything else is parsed as CSV with a header row.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref().to_path_buf();
        let df = read_frame(&path)?;
        let (symbols, series) = frame_to_series(&df)?;
        info!(
            path = %path.display(),
            symbols = symbols.len(),
            rows = df.height(),
            "price table imported"
        );
        Ok(Self {
            path,
            series,
            symbols,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Symbols present in the table, in column order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

impl PriceProvider for CsvPriceProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let all = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        let points: Vec<PricePoint> = all
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();
        if points.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: format!("no prices between {start} and {end}"),
            });
        }
        Ok(PriceSeries {
            symbol: symbol.to_string(),
            points,
            source: DataSource::CsvImport,
        })
    }
}

fn read_frame(path: &Path) -> Result<DataFrame, DataError> {
    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));

    if is_parquet {
        let file = fs::File::open(path)
            .map_err(|e| DataError::Import(format!("open {}: {e}", path.display())))?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| DataError::Import(format!("read parquet {}: {e}", path.display())))
    } else {
        CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| DataError::Import(format!("read csv {}: {e}", path.display())))
    }
}

type SeriesMap = HashMap<String, Vec<PricePoint>>;

fn frame_to_series(df: &DataFrame) -> Result<(Vec<String>, SeriesMap), DataError> {
    let map_err = |e: PolarsError| DataError::Import(format!("column read: {e}"));

    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    let date_name = names
        .iter()
        .find(|n| n.eq_ignore_ascii_case(DATE_COLUMN))
        .cloned()
        .ok_or_else(|| DataError::Import(format!("missing '{DATE_COLUMN}' column")))?;

    let date_col = df
        .column(&date_name)
        .map_err(map_err)?
        .cast(&DataType::String)
        .map_err(map_err)?;
    let dates = date_col
        .str()
        .map_err(map_err)?
        .into_iter()
        .enumerate()
        .map(|(row, raw)| {
            let raw = raw.ok_or_else(|| DataError::Import(format!("null date at row {row}")))?;
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|e| DataError::Import(format!("bad date '{raw}' at row {row}: {e}")))
        })
        .collect::<Result<Vec<NaiveDate>, DataError>>()?;

    let mut symbols = Vec::new();
    let mut series = HashMap::new();
    for name in names.iter().filter(|n| **n != date_name) {
        let values = df
            .column(name)
            .map_err(map_err)?
            .cast(&DataType::Float64)
            .map_err(map_err)?;
        let values = values.f64().map_err(map_err)?;

        let mut points: Vec<PricePoint> = dates
            .iter()
            .zip(values.into_iter())
            .filter_map(|(&date, v)| {
                v.filter(|v| v.is_finite())
                    .map(|adj_close| PricePoint { date, adj_close })
            })
            .collect();
        points.sort_by_key(|p| p.date);

        symbols.push(name.clone());
        series.insert(name.clone(), points);
    }

    if symbols.is_empty() {
        return Err(DataError::Import("table has no price columns".into()));
    }
    Ok((symbols, series))
}
