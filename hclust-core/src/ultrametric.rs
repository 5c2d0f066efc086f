//! Subdominant ultrametric: the largest original edge weight on the unique MST
//! path between two labels.
//!
//! The result satisfies `u(i, j) <= max(u(i, k), u(k, j))` for every triple and
//! is the tightest ultrametric dominated by the input distances. It is the
//! single-linkage cophenetic distance.

use crate::distance::DistanceMatrix;
use crate::domain::{LabelSet, LabeledMatrix, SquareMatrix};
use crate::error::{CoreError, Stage};
use crate::predecessor::PredecessorTable;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct UltrametricMatrix {
    inner: LabeledMatrix,
}

impl UltrametricMatrix {
    pub fn labels(&self) -> &Arc<LabelSet> {
        self.inner.labels()
    }

    pub fn matrix(&self) -> &LabeledMatrix {
        &self.inner
    }

    pub fn dim(&self) -> usize {
        self.inner.dim()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.inner.get(i, j)
    }

    pub fn get_by_label(&self, a: &str, b: &str) -> Option<f64> {
        self.inner.get_by_label(a, b)
    }

    /// Largest amount by which any triple breaks the strong triangle inequality.
    ///
    /// Zero for a valid ultrametric. O(n³).
    pub fn max_violation(&self) -> f64 {
        let n = self.dim();
        let mut worst: f64 = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let uij = self.get(i, j);
                for k in 0..n {
                    let bound = self.get(i, k).max(self.get(k, j));
                    worst = worst.max(uij - bound);
                }
            }
        }
        worst
    }
}

/// Derive the ultrametric matrix from distances and the MST predecessor table.
///
/// Only the upper triangle is resolved; the lower triangle mirrors it and the
/// diagonal is zero by definition.
pub fn subdominant_ultrametric(
    distances: &DistanceMatrix,
    predecessors: &PredecessorTable,
) -> Result<UltrametricMatrix, CoreError> {
    if distances.labels() != predecessors.labels() {
        return Err(CoreError::invalid_input(
            Stage::Ultrametric,
            "distance matrix and predecessor table cover different label sets",
        ));
    }

    let n = distances.dim();
    let mut values = SquareMatrix::zeros(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let u = path_maximum(distances, predecessors, i, j)?;
            values.set(i, j, u);
            values.set(j, i, u);
        }
    }

    let inner = LabeledMatrix::new(distances.labels().clone(), values, Stage::Ultrametric)?;
    Ok(UltrametricMatrix { inner })
}

/// Ultrametric distance for a single pair of labels.
///
/// Equal labels give zero without touching the tree.
pub fn ultrametric_distance(
    distances: &DistanceMatrix,
    predecessors: &PredecessorTable,
    from: &str,
    to: &str,
) -> Result<f64, CoreError> {
    let (i, j) = predecessors.resolve_pair(from, to, Stage::Ultrametric)?;
    if i == j {
        return Ok(0.0);
    }
    if distances.labels() != predecessors.labels() {
        return Err(CoreError::invalid_input(
            Stage::Ultrametric,
            "distance matrix and predecessor table cover different label sets",
        ));
    }
    path_maximum(distances, predecessors, i, j)
}

/// Maximum original distance over the edges of the tree path `i → j`, `i != j`.
fn path_maximum(
    distances: &DistanceMatrix,
    predecessors: &PredecessorTable,
    i: usize,
    j: usize,
) -> Result<f64, CoreError> {
    let path = predecessors.path(i, j)?;
    Ok(path
        .windows(2)
        .map(|step| distances.get(step[0], step[1]))
        .fold(f64::NEG_INFINITY, f64::max))
}
