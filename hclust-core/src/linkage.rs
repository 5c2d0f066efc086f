//! Condensed distance vectors for agglomerative-linkage tools.
//!
//! Condensed form is the upper triangle of a symmetric zero-diagonal matrix,
//! row-major, diagonal excluded: `n (n - 1) / 2` values. Linkage and dendrogram
//! rendering happen outside this crate.

use crate::domain::{LabelSet, SquareMatrix};
use crate::error::{CoreError, Stage};
use crate::ultrametric::UltrametricMatrix;
use serde::{Deserialize, Serialize};

/// Labelled condensed vector handed to a linkage routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondensedDistances {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl CondensedDistances {
    pub fn from_ultrametric(u: &UltrametricMatrix) -> Self {
        Self {
            labels: u.labels().to_vec(),
            values: condensed(u.matrix().values()),
        }
    }

    /// Value for a pair of labels (zero on the diagonal).
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        if i == j {
            return Some(0.0);
        }
        self.values
            .get(condensed_index(self.labels.len(), i, j))
            .copied()
    }

    /// Expand back to a labelled square matrix.
    pub fn to_square(&self) -> Result<(LabelSet, SquareMatrix), CoreError> {
        let labels = LabelSet::new(self.labels.iter().cloned())?;
        let m = squareform(&self.values)?;
        if m.dim() != labels.len() {
            return Err(CoreError::invalid_input(
                Stage::Ultrametric,
                format!(
                    "{} condensed values do not match {} labels",
                    self.values.len(),
                    labels.len()
                ),
            ));
        }
        Ok((labels, m))
    }
}

/// Upper triangle, row-major, no diagonal.
pub fn condensed(m: &SquareMatrix) -> Vec<f64> {
    m.upper_triangle().map(|(_, _, v)| v).collect()
}

/// Position of `(i, j)`, `i != j`, inside a condensed vector over `n` labels.
pub fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i < j { (i, j) } else { (j, i) };
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

/// Inverse of [`condensed`]: rebuild the symmetric zero-diagonal matrix.
pub fn squareform(values: &[f64]) -> Result<SquareMatrix, CoreError> {
    let n = triangular_dimension(values.len()).ok_or_else(|| {
        CoreError::invalid_input(
            Stage::Ultrametric,
            format!("condensed length {} is not a triangular number", values.len()),
        )
    })?;
    let mut m = SquareMatrix::zeros(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let v = values[condensed_index(n, i, j)];
            m.set(i, j, v);
            m.set(j, i, v);
        }
    }
    Ok(m)
}

/// `n` such that `n (n - 1) / 2 == len`.
fn triangular_dimension(len: usize) -> Option<usize> {
    let n = ((1.0 + (1.0 + 8.0 * len as f64).sqrt()) / 2.0).round() as usize;
    (n * n.saturating_sub(1) / 2 == len).then_some(n)
}
