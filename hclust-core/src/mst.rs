//! Minimum spanning tree over the complete graph implied by a distance matrix.
//!
//! Kruskal's algorithm over the upper triangle. Candidate edges are ordered by
//! `(weight, row label, column label)`, so equal weights resolve to the
//! lexicographically smallest label pair and the resulting tree does not depend
//! on the order of the label set.

use crate::distance::DistanceMatrix;
use crate::domain::{LabelSet, SquareMatrix};
use crate::error::{CoreError, Stage};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Undirected tree edge between label positions `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeEdge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpanningTree {
    labels: Arc<LabelSet>,
    /// Edges in acceptance order (non-decreasing weight).
    edges: Vec<TreeEdge>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl SpanningTree {
    /// Build a tree from an explicit edge list.
    ///
    /// Fails unless the edges form a spanning tree: exactly `n - 1` edges, no
    /// self-loop, no cycle.
    pub fn from_edges(labels: Arc<LabelSet>, edges: Vec<TreeEdge>) -> Result<Self, CoreError> {
        let n = labels.len();
        let stage = Stage::SpanningTree;
        if n == 0 {
            return Err(CoreError::invalid_input(stage, "label set is empty"));
        }
        if edges.len() != n - 1 {
            return Err(CoreError::invalid_input(
                stage,
                format!("{} edges for {n} labels, expected {}", edges.len(), n - 1),
            ));
        }

        let mut sets = DisjointSets::new(n);
        let mut normalized = Vec::with_capacity(edges.len());
        for e in edges {
            if e.a >= n || e.b >= n || e.a == e.b {
                return Err(CoreError::invalid_input(
                    stage,
                    format!("edge ({}, {}) is out of range or a self-loop", e.a, e.b),
                ));
            }
            if !sets.union(e.a, e.b) {
                return Err(CoreError::invalid_input(
                    stage,
                    format!(
                        "edge ({}, {}) closes a cycle",
                        labels.name(e.a),
                        labels.name(e.b)
                    ),
                ));
            }
            normalized.push(TreeEdge {
                a: e.a.min(e.b),
                b: e.a.max(e.b),
                weight: e.weight,
            });
        }

        Ok(Self::assemble(labels, normalized))
    }

    fn assemble(labels: Arc<LabelSet>, edges: Vec<TreeEdge>) -> Self {
        let mut adjacency = vec![Vec::new(); labels.len()];
        for e in &edges {
            adjacency[e.a].push((e.b, e.weight));
            adjacency[e.b].push((e.a, e.weight));
        }
        Self {
            labels,
            edges,
            adjacency,
        }
    }

    pub fn labels(&self) -> &Arc<LabelSet> {
        &self.labels
    }

    pub fn edges(&self) -> &[TreeEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }

    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    /// Weight of the tree edge between two nodes, if they are adjacent.
    pub fn weight_between(&self, a: usize, b: usize) -> Option<f64> {
        self.adjacency
            .get(a)?
            .iter()
            .find(|(other, _)| *other == b)
            .map(|(_, w)| *w)
    }

    /// Dense form: edge weights at both `(a, b)` and `(b, a)`, zero elsewhere.
    pub fn to_matrix(&self) -> SquareMatrix {
        let mut m = SquareMatrix::zeros(self.node_count());
        for e in &self.edges {
            m.set(e.a, e.b, e.weight);
            m.set(e.b, e.a, e.weight);
        }
        m
    }

    /// Edges as `(label, label, weight)`.
    pub fn labeled_edges(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        self.edges
            .iter()
            .map(|e| (self.labels.name(e.a), self.labels.name(e.b), e.weight))
    }
}

/// Kruskal MST with deterministic tie-breaking.
///
/// Infinite distances are absent edges. Fails with `DisconnectedGraph` when the
/// finite edges do not connect every label.
pub fn minimum_spanning_tree(distances: &DistanceMatrix) -> Result<SpanningTree, CoreError> {
    let labels = distances.labels().clone();
    let n = labels.len();
    if n == 0 {
        return Err(CoreError::invalid_input(
            Stage::SpanningTree,
            "label set is empty",
        ));
    }

    let mut candidates: Vec<TreeEdge> = distances
        .matrix()
        .values()
        .upper_triangle()
        .filter(|(_, _, w)| w.is_finite())
        .map(|(a, b, weight)| TreeEdge { a, b, weight })
        .collect();

    candidates.sort_by(|x, y| compare_edges(&labels, x, y));

    let mut sets = DisjointSets::new(n);
    let mut edges = Vec::with_capacity(n - 1);
    for edge in candidates {
        if edges.len() == n - 1 {
            break;
        }
        if sets.union(edge.a, edge.b) {
            edges.push(edge);
        }
    }

    if edges.len() < n - 1 {
        let root = sets.find(0);
        let unreachable = (0..n)
            .filter(|&i| sets.find(i) != root)
            .map(|i| labels.name(i).to_string())
            .collect();
        return Err(CoreError::DisconnectedGraph {
            stage: Stage::SpanningTree,
            root: labels.name(0).to_string(),
            unreachable,
        });
    }

    Ok(SpanningTree::assemble(labels, edges))
}

/// Weight first, then `(row label, column label)` lexicographically.
fn compare_edges(labels: &LabelSet, x: &TreeEdge, y: &TreeEdge) -> Ordering {
    x.weight
        .total_cmp(&y.weight)
        .then_with(|| edge_key(labels, x).cmp(&edge_key(labels, y)))
}

/// Endpoint labels with the smaller one first, so the key is orientation-free.
fn edge_key<'a>(labels: &'a LabelSet, e: &TreeEdge) -> (&'a str, &'a str) {
    let (a, b) = (labels.name(e.a), labels.name(e.b));
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Union–find with path compression and union by rank.
#[derive(Debug)]
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns false when they were already joined.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            Ordering::Less => self.parent[ra] = rb,
            Ordering::Greater => self.parent[rb] = ra,
            Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distances(names: &[&str], rows: Vec<Vec<f64>>) -> DistanceMatrix {
        let labels = Arc::new(LabelSet::new(names.iter().copied()).unwrap());
        DistanceMatrix::new(labels, SquareMatrix::from_rows(rows, Stage::Distance).unwrap())
            .unwrap()
    }

    fn four_labels() -> DistanceMatrix {
        distances(
            &["A", "B", "C", "D"],
            vec![
                vec![0.0, 0.2, 0.5, 0.9],
                vec![0.2, 0.0, 0.4, 0.8],
                vec![0.5, 0.4, 0.0, 0.3],
                vec![0.9, 0.8, 0.3, 0.0],
            ],
        )
    }

    #[test]
    fn picks_minimum_edges() {
        let tree = minimum_spanning_tree(&four_labels()).unwrap();
        let edges: Vec<_> = tree.labeled_edges().collect();
        assert_eq!(edges, vec![("A", "B", 0.2), ("C", "D", 0.3), ("B", "C", 0.4)]);
        assert!((tree.total_weight() - 0.9).abs() < 1e-12);
        assert_eq!(tree.weight_between(2, 1), Some(0.4));
        assert_eq!(tree.weight_between(0, 3), None);
    }

    #[test]
    fn single_label_has_no_edges() {
        let tree = minimum_spanning_tree(&distances(&["SPY"], vec![vec![0.0]])).unwrap();
        assert!(tree.edges().is_empty());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn ties_resolve_to_smallest_label_pair() {
        // Every edge weighs 1.0, so the tree is decided by the labels alone.
        let d = distances(
            &["C", "A", "B"],
            vec![
                vec![0.0, 1.0, 1.0],
                vec![1.0, 0.0, 1.0],
                vec![1.0, 1.0, 0.0],
            ],
        );
        let tree = minimum_spanning_tree(&d).unwrap();
        let edges: Vec<_> = tree.labeled_edges().collect();
        assert_eq!(edges, vec![("A", "B", 1.0), ("C", "A", 1.0)]);
    }

    #[test]
    fn zero_distance_is_a_real_edge() {
        let d = distances(&["A", "B"], vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
        let tree = minimum_spanning_tree(&d).unwrap();
        assert_eq!(tree.edges().len(), 1);
    }

    #[test]
    fn signed_zero_ties_resolve_by_label() {
        let d = distances(
            &["A", "B", "C"],
            vec![
                vec![0.0, 0.0, 0.0],
                vec![0.0, 0.0, -0.0],
                vec![0.0, -0.0, 0.0],
            ],
        );
        let tree = minimum_spanning_tree(&d).unwrap();
        let edges: Vec<_> = tree.labeled_edges().collect();
        assert_eq!(edges, vec![("A", "B", 0.0), ("A", "C", 0.0)]);
        assert!(tree.edges().iter().all(|e| e.weight.is_sign_positive()));
    }

    #[test]
    fn disconnected_components_are_reported() {
        let inf = f64::INFINITY;
        let d = distances(
            &["A", "B", "C", "D"],
            vec![
                vec![0.0, 0.1, inf, inf],
                vec![0.1, 0.0, inf, inf],
                vec![inf, inf, 0.0, 0.2],
                vec![inf, inf, 0.2, 0.0],
            ],
        );
        let err = minimum_spanning_tree(&d).unwrap_err();
        assert_eq!(
            err,
            CoreError::DisconnectedGraph {
                stage: Stage::SpanningTree,
                root: "A".into(),
                unreachable: vec!["C".into(), "D".into()],
            }
        );
    }

    #[test]
    fn to_matrix_is_symmetric() {
        let tree = minimum_spanning_tree(&four_labels()).unwrap();
        let m = tree.to_matrix();
        assert_eq!(m.get(0, 1), 0.2);
        assert_eq!(m.get(1, 0), 0.2);
        assert_eq!(m.get(0, 3), 0.0);
    }

    #[test]
    fn from_edges_validates_shape() {
        let labels = Arc::new(LabelSet::new(["A", "B", "C"]).unwrap());
        let cycle = vec![
            TreeEdge { a: 0, b: 1, weight: 1.0 },
            TreeEdge { a: 1, b: 0, weight: 1.0 },
        ];
        assert!(SpanningTree::from_edges(labels.clone(), cycle).is_err());

        let ok = vec![
            TreeEdge { a: 1, b: 0, weight: 1.0 },
            TreeEdge { a: 2, b: 1, weight: 2.0 },
        ];
        let tree = SpanningTree::from_edges(labels, ok).unwrap();
        assert_eq!(tree.edges()[0], TreeEdge { a: 0, b: 1, weight: 1.0 });
    }
}
