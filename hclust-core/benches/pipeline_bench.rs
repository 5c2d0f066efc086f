//! Criterion benchmarks for the hierarchy pipeline.
//!
//! Benchmarks:
//! 1. Pearson correlation over a year of daily returns
//! 2. Kruskal MST alone
//! 3. Full distance → MST → predecessors → ultrametric pass

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use hclust_core::data::{load_returns, ReturnCache, ReturnRequest, SyntheticProvider};
use hclust_core::{
    minimum_spanning_tree, CorrelationEstimator, DistanceMatrix, HierarchyPipeline, NaPolicy,
    Pearson, ReturnTable,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_returns(n: usize) -> ReturnTable {
    let provider = SyntheticProvider::new(7).with_sectors(5);
    let symbols = (0..n).map(|i| format!("SYM{i:03}")).collect();
    let req = ReturnRequest::new(
        symbols,
        chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2023, 12, 31),
        NaPolicy::DropSeries,
    );
    let mut cache: ReturnCache = ReturnCache::new();
    let loaded = load_returns(&provider, &mut cache, &req).unwrap();
    (*loaded.table).clone()
}

fn make_distances(n: usize) -> DistanceMatrix {
    let corr = Pearson.correlate(&make_returns(n)).unwrap();
    DistanceMatrix::from_correlation(&corr).unwrap()
}

const SIZES: [usize; 3] = [20, 50, 100];

// ── 1. Correlation ───────────────────────────────────────────────────

fn bench_correlation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pearson_correlation");
    for &n in &SIZES {
        let returns = make_returns(n);
        group.bench_with_input(BenchmarkId::new("labels", n), &n, |b, _| {
            b.iter(|| Pearson.correlate(black_box(&returns)).unwrap())
        });
    }
    group.finish();
}

// ── 2. Spanning tree ─────────────────────────────────────────────────

fn bench_mst(c: &mut Criterion) {
    let mut group = c.benchmark_group("minimum_spanning_tree");
    for &n in &SIZES {
        let distances = make_distances(n);
        group.bench_with_input(BenchmarkId::new("labels", n), &n, |b, _| {
            b.iter(|| minimum_spanning_tree(black_box(&distances)).unwrap())
        });
    }
    group.finish();
}

// ── 3. Full pipeline ─────────────────────────────────────────────────

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy_pipeline");
    group.sample_size(20);
    for &n in &SIZES {
        let distances = make_distances(n);
        group.bench_with_input(BenchmarkId::new("labels", n), &n, |b, _| {
            b.iter(|| HierarchyPipeline::from_distances(black_box(distances.clone())).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_correlation, bench_mst, bench_pipeline);
criterion_main!(benches);
