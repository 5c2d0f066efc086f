//! Property tests for the distance → MST → ultrametric pipeline.
//!
//! Uses proptest to verify:
//! 1. Distance bounds: symmetric, zero diagonal, entries in [0, 2]
//! 2. MST optimality: n-1 edges, spanning, minimal against brute force (n <= 6)
//! 3. Tie-break determinism: bit-identical trees, independent of label order
//! 4. Ultrametric: strong triangle inequality, symmetry, dominated by distances
//! 5. Idempotence and the two-label boundary

use chrono::NaiveDate;
use hclust_core::linkage::squareform;
use hclust_core::{
    minimum_spanning_tree, CorrelationEstimator, DistanceMatrix, HierarchyPipeline, LabelSet,
    Pearson, ReturnTable, SquareMatrix,
};
use proptest::prelude::*;
use std::sync::Arc;

// ── Strategies (proptest) ────────────────────────────────────────────

fn labels(n: usize) -> Arc<LabelSet> {
    Arc::new(LabelSet::new((0..n).map(|i| format!("S{i:02}"))).unwrap())
}

/// Return columns for `n` labels over 40 observations.
fn arb_returns(max_n: usize) -> impl Strategy<Value = ReturnTable> {
    (2..=max_n).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec(-0.05..0.05_f64, 40), n).prop_map(
            move |columns| {
                let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
                let dates = (0..40).map(|d| start + chrono::Duration::days(d)).collect();
                ReturnTable::new(labels(n), dates, columns).unwrap()
            },
        )
    })
}

/// Distances on a coarse 0.1 grid so equal weights are common.
fn arb_distances(min_n: usize, max_n: usize) -> impl Strategy<Value = DistanceMatrix> {
    (min_n..=max_n).prop_flat_map(|n| {
        prop::collection::vec((1u8..=20).prop_map(|k| f64::from(k) / 10.0), n * (n - 1) / 2)
            .prop_map(move |condensed| {
                DistanceMatrix::new(labels(n), squareform(&condensed).unwrap()).unwrap()
            })
    })
}

/// Reverse the label order, keeping every labelled distance.
fn reversed(d: &DistanceMatrix) -> DistanceMatrix {
    let n = d.dim();
    let names: Vec<String> = d.labels().as_slice().iter().rev().cloned().collect();
    let values = SquareMatrix::from_fn(n, |i, j| d.get(n - 1 - i, n - 1 - j));
    DistanceMatrix::new(Arc::new(LabelSet::new(names).unwrap()), values).unwrap()
}

fn sorted_label_edges(d: &DistanceMatrix) -> Vec<(String, String, u64)> {
    let tree = minimum_spanning_tree(d).unwrap();
    let mut edges: Vec<(String, String, u64)> = tree
        .labeled_edges()
        .map(|(a, b, w)| {
            let (a, b) = if a <= b { (a, b) } else { (b, a) };
            (a.to_string(), b.to_string(), w.to_bits())
        })
        .collect();
    edges.sort();
    edges
}

fn root(parent: &[usize], mut x: usize) -> usize {
    while parent[x] != x {
        x = parent[x];
    }
    x
}

/// Minimum total weight over every spanning tree, by enumerating edge subsets.
fn brute_force_mst_weight(d: &DistanceMatrix) -> f64 {
    let n = d.dim();
    let all: Vec<(usize, usize, f64)> = d.matrix().values().upper_triangle().collect();
    let mut best = f64::INFINITY;
    let m = all.len();
    for mask in 0u32..(1 << m) {
        if mask.count_ones() as usize != n - 1 {
            continue;
        }
        let mut parent: Vec<usize> = (0..n).collect();
        let mut weight = 0.0;
        let mut acyclic = true;
        for (k, &(a, b, w)) in all.iter().enumerate() {
            if mask & (1 << k) == 0 {
                continue;
            }
            let (ra, rb) = (root(&parent, a), root(&parent, b));
            if ra == rb {
                acyclic = false;
                break;
            }
            parent[ra] = rb;
            weight += w;
        }
        if acyclic {
            best = best.min(weight);
        }
    }
    best
}

// ── 1. Distance bounds ───────────────────────────────────────────────

proptest! {
    #[test]
    fn distances_from_correlation_are_bounded(returns in arb_returns(8)) {
        let corr = Pearson.correlate(&returns).unwrap();
        let d = DistanceMatrix::from_correlation(&corr).unwrap();
        for i in 0..d.dim() {
            prop_assert_eq!(d.get(i, i), 0.0);
            for j in 0..d.dim() {
                prop_assert_eq!(d.get(i, j), d.get(j, i));
                prop_assert!((0.0..=2.0).contains(&d.get(i, j)));
            }
        }
    }
}

// ── 2. MST optimality ────────────────────────────────────────────────

proptest! {
    #[test]
    fn mst_spans_with_n_minus_one_edges(d in arb_distances(2, 12)) {
        let tree = minimum_spanning_tree(&d).unwrap();
        let n = d.dim();
        prop_assert_eq!(tree.edges().len(), n - 1);

        // Connected with n - 1 edges implies acyclic.
        let mut seen = vec![false; n];
        let mut stack = vec![0];
        seen[0] = true;
        while let Some(node) = stack.pop() {
            for &(next, _) in tree.neighbors(node) {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
        prop_assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn mst_weight_is_minimal(d in arb_distances(2, 6)) {
        let tree = minimum_spanning_tree(&d).unwrap();
        let best = brute_force_mst_weight(&d);
        prop_assert!((tree.total_weight() - best).abs() < 1e-9);
    }
}

// ── 3. Tie-break determinism ─────────────────────────────────────────

proptest! {
    #[test]
    fn mst_is_bit_identical_across_runs(d in arb_distances(2, 10)) {
        let first = minimum_spanning_tree(&d).unwrap();
        let second = minimum_spanning_tree(&d).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn mst_ignores_label_order(d in arb_distances(2, 10)) {
        prop_assert_eq!(sorted_label_edges(&d), sorted_label_edges(&reversed(&d)));
    }
}

// ── 4. Ultrametric ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn ultrametric_inequality_and_symmetry(d in arb_distances(2, 10)) {
        let pipeline = HierarchyPipeline::from_distances(d.clone()).unwrap();
        let u = pipeline.ultrametric();
        let n = u.dim();
        for i in 0..n {
            prop_assert_eq!(u.get(i, i), 0.0);
            for j in 0..n {
                prop_assert_eq!(u.get(i, j), u.get(j, i));
                prop_assert!(u.get(i, j) <= d.get(i, j));
                for k in 0..n {
                    prop_assert!(u.get(i, j) <= u.get(i, k).max(u.get(k, j)));
                }
            }
        }
        prop_assert_eq!(u.max_violation(), 0.0);
    }

    #[test]
    fn ultrametric_from_returns_is_valid(returns in arb_returns(8)) {
        let pipeline = HierarchyPipeline::from_returns(&returns, &Pearson).unwrap();
        prop_assert!(pipeline.ultrametric().max_violation() <= 0.0);
    }
}

// ── 5. Idempotence and boundary ──────────────────────────────────────

proptest! {
    #[test]
    fn pipeline_is_idempotent(d in arb_distances(2, 10)) {
        let a = HierarchyPipeline::from_distances(d.clone()).unwrap();
        let b = HierarchyPipeline::from_distances(d).unwrap();
        prop_assert_eq!(a.ultrametric(), b.ultrametric());
    }

    #[test]
    fn two_labels_reproduce_the_distance(d in arb_distances(2, 2)) {
        let pipeline = HierarchyPipeline::from_distances(d.clone()).unwrap();
        prop_assert_eq!(pipeline.ultrametric().matrix().values(), d.matrix().values());
    }
}
