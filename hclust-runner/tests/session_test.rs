use chrono::NaiveDate;
use hclust_core::data::{DataError, PriceProvider, PriceSeries, ReturnRequest, SyntheticProvider};
use hclust_core::{DistanceMatrix, LabelSet, NaPolicy, SquareMatrix, Stage};
use hclust_runner::{AnalysisConfig, AnalysisSession, MatrixInput, SessionError};
use std::sync::Arc;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn request(symbols: &[&str], na_policy: NaPolicy) -> ReturnRequest {
    ReturnRequest::new(
        symbols.iter().map(|s| s.to_string()).collect(),
        d(2023, 1, 1),
        Some(d(2023, 6, 30)),
        na_policy,
    )
}

fn synthetic_session() -> AnalysisSession {
    let provider = SyntheticProvider::new(7)
        .assign("XOM", 0)
        .assign("CVX", 0)
        .assign("AAPL", 1)
        .assign("MSFT", 1);
    AnalysisSession::new(Box::new(provider))
}

/// Synthetic prices, except for one symbol that never resolves.
struct OneBadSymbol(SyntheticProvider);

impl PriceProvider for OneBadSymbol {
    fn name(&self) -> &str {
        "one_bad"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        if symbol == "BAD" {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        self.0.fetch(symbol, start, end)
    }
}

#[test]
fn synthetic_run_produces_consistent_report() {
    let mut session = synthetic_session();
    let report = session
        .run(&request(&["XOM", "AAPL", "CVX", "MSFT"], NaPolicy::DropSeries))
        .unwrap();

    assert_eq!(report.labels, vec!["XOM", "AAPL", "CVX", "MSFT"]);
    assert_eq!(report.mst_edges.len(), 3);
    assert!(report.dropped.is_empty());
    assert!(report.observations > 100);
    assert_eq!(report.condensed.len(), 6);
    assert!(report.max_violation <= 1e-12);

    let energy = report.ultrametric_between("XOM", "CVX").unwrap();
    let cross = report.ultrametric_between("XOM", "AAPL").unwrap();
    assert!(energy < cross, "same-sector pair should merge first");
}

#[test]
fn repeated_requests_hit_report_cache() {
    let mut session = synthetic_session();
    let first = session
        .run(&request(&["XOM", "CVX", "AAPL"], NaPolicy::DropSeries))
        .unwrap();
    let second = session
        .run(&request(&["AAPL", "XOM", "CVX"], NaPolicy::DropSeries))
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(session.cached_reports(), 1);
    assert_eq!(session.return_cache().misses(), 1);

    let other_policy = session
        .run(&request(&["XOM", "CVX", "AAPL"], NaPolicy::PairwiseComplete))
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &other_policy));
    assert_eq!(session.cached_reports(), 2);
}

#[test]
fn unresolved_symbol_follows_na_policy() {
    let mut session = AnalysisSession::new(Box::new(OneBadSymbol(SyntheticProvider::new(3))));

    let report = session
        .run(&request(&["SPY", "BAD", "QQQ"], NaPolicy::DropSeries))
        .unwrap();
    assert_eq!(report.labels, vec!["SPY", "QQQ"]);
    assert_eq!(report.dropped, vec!["BAD"]);

    let err = session
        .run(&request(&["SPY", "BAD", "QQQ"], NaPolicy::PairwiseComplete))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Data(DataError::MissingData { .. })
    ));
}

#[test]
fn run_matrix_on_distances() {
    let labels = Arc::new(LabelSet::new(["A", "B", "C", "D"]).unwrap());
    let rows = vec![
        vec![0.0, 0.2, 0.9, 1.0],
        vec![0.2, 0.0, 0.4, 0.8],
        vec![0.9, 0.4, 0.0, 0.3],
        vec![1.0, 0.8, 0.3, 0.0],
    ];
    let distances =
        DistanceMatrix::new(labels, SquareMatrix::from_rows(rows, Stage::Distance).unwrap())
            .unwrap();

    let mut session = synthetic_session();
    let report = session
        .run_matrix(MatrixInput::Distance(distances.clone()))
        .unwrap();
    assert_eq!(report.source, "distance_matrix");
    assert_eq!(report.observations, 0);
    assert_eq!(report.ultrametric_between("A", "D"), Some(0.4));
    assert_eq!(report.condensed, vec![0.2, 0.4, 0.4, 0.4, 0.4, 0.3]);
    assert!((report.total_weight - 0.9).abs() < 1e-12);

    let again = session.run_matrix(MatrixInput::Distance(distances)).unwrap();
    assert!(Arc::ptr_eq(&report, &again));
}

#[test]
fn disconnected_matrix_is_core_error() {
    let labels = Arc::new(LabelSet::new(["A", "B", "C"]).unwrap());
    let inf = f64::INFINITY;
    let rows = vec![
        vec![0.0, 0.5, inf],
        vec![0.5, 0.0, inf],
        vec![inf, inf, 0.0],
    ];
    let distances =
        DistanceMatrix::new(labels, SquareMatrix::from_rows(rows, Stage::Distance).unwrap())
            .unwrap();

    let mut session = synthetic_session();
    let err = session
        .run_matrix(MatrixInput::Distance(distances))
        .unwrap_err();
    assert!(matches!(err, SessionError::Core(_)));
    assert_eq!(session.cached_reports(), 0);
}

#[test]
fn session_from_synthetic_config() {
    let config = AnalysisConfig::from_toml(
        r#"
        [analysis]
        symbols = ["SPY", "QQQ", "IWM"]
        start = "2023-01-01"
        end = "2023-03-31"

        [source]
        kind = "synthetic"
        seed = 11
        "#,
    )
    .unwrap();

    let mut session = AnalysisSession::from_config(&config).unwrap();
    assert_eq!(session.source_tag(), "synthetic:11");

    let report = session.run_config(&config).unwrap();
    assert_eq!(report.id, config.analysis_id());
    assert_eq!(report.source, "synthetic:11");
    assert_eq!(report.label_count(), 3);
}
