//! Dense square matrices, with and without labels.

use super::labels::LabelSet;
use crate::error::{CoreError, Stage};
use std::sync::Arc;

/// Row-major `n × n` matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                data.push(f(i, j));
            }
        }
        Self { n, data }
    }

    /// Build from nested rows. Fails when any row length differs from the row count.
    pub fn from_rows(rows: Vec<Vec<f64>>, stage: Stage) -> Result<Self, CoreError> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(CoreError::invalid_input(
                    stage,
                    format!("matrix is not square: row {i} has {} columns, expected {n}", row.len()),
                ));
            }
            data.extend(row);
        }
        Ok(Self { n, data })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.n + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.n).map(|i| self.row(i).to_vec()).collect()
    }

    /// Entries `(i, j, value)` with `i < j`, row-major.
    pub fn upper_triangle(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n).flat_map(move |i| ((i + 1)..self.n).map(move |j| (i, j, self.get(i, j))))
    }

    /// Largest `|m[i][j] - m[j][i]|`. Infinite pairs of the same sign count as equal.
    pub fn max_asymmetry(&self) -> f64 {
        let mut worst: f64 = 0.0;
        for (i, j, upper) in self.upper_triangle() {
            let lower = self.get(j, i);
            if upper == lower {
                continue;
            }
            let diff = (upper - lower).abs();
            if diff.is_nan() {
                return f64::NAN;
            }
            worst = worst.max(diff);
        }
        worst
    }

    /// Copy the upper triangle over the lower one and set the diagonal.
    pub(crate) fn mirrored_upper(&self, diagonal: f64) -> Self {
        Self::from_fn(self.n, |i, j| match i.cmp(&j) {
            std::cmp::Ordering::Less => self.get(i, j),
            std::cmp::Ordering::Equal => diagonal,
            std::cmp::Ordering::Greater => self.get(j, i),
        })
    }
}

/// A square matrix whose rows and columns are identified by a shared label set.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    labels: Arc<LabelSet>,
    values: SquareMatrix,
}

impl LabeledMatrix {
    pub fn new(labels: Arc<LabelSet>, values: SquareMatrix, stage: Stage) -> Result<Self, CoreError> {
        if labels.len() != values.dim() {
            return Err(CoreError::invalid_input(
                stage,
                format!(
                    "matrix dimension {} does not match {} labels",
                    values.dim(),
                    labels.len()
                ),
            ));
        }
        Ok(Self { labels, values })
    }

    pub fn labels(&self) -> &Arc<LabelSet> {
        &self.labels
    }

    pub fn values(&self) -> &SquareMatrix {
        &self.values
    }

    pub fn dim(&self) -> usize {
        self.values.dim()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values.get(i, j)
    }

    pub fn get_by_label(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.labels.index_of(row)?;
        let j = self.labels.index_of(col)?;
        Some(self.values.get(i, j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged() {
        let err = SquareMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0]], Stage::Distance)
            .unwrap_err();
        assert!(err.to_string().contains("not square"));
    }

    #[test]
    fn from_rows_rejects_rectangular() {
        let rows = vec![vec![0.0, 1.0, 2.0], vec![1.0, 0.0, 3.0]];
        assert!(SquareMatrix::from_rows(rows, Stage::Correlation).is_err());
    }

    #[test]
    fn upper_triangle_order() {
        let m = SquareMatrix::from_fn(3, |i, j| (i * 10 + j) as f64);
        let upper: Vec<_> = m.upper_triangle().collect();
        assert_eq!(upper, vec![(0, 1, 1.0), (0, 2, 2.0), (1, 2, 12.0)]);
    }

    #[test]
    fn asymmetry_and_mirror() {
        let m = SquareMatrix::from_rows(
            vec![vec![9.0, 0.5], vec![0.25, 9.0]],
            Stage::Distance,
        )
        .unwrap();
        assert_eq!(m.max_asymmetry(), 0.25);
        let mirrored = m.mirrored_upper(0.0);
        assert_eq!(mirrored.get(1, 0), 0.5);
        assert_eq!(mirrored.get(0, 0), 0.0);
        assert_eq!(mirrored.max_asymmetry(), 0.0);
    }

    #[test]
    fn infinite_pairs_are_symmetric() {
        let m = SquareMatrix::from_rows(
            vec![vec![0.0, f64::INFINITY], vec![f64::INFINITY, 0.0]],
            Stage::Distance,
        )
        .unwrap();
        assert_eq!(m.max_asymmetry(), 0.0);
    }

    #[test]
    fn labeled_dimension_mismatch() {
        let labels = Arc::new(LabelSet::new(["A", "B"]).unwrap());
        assert!(LabeledMatrix::new(labels.clone(), SquareMatrix::zeros(3), Stage::Distance).is_err());
        let m = LabeledMatrix::new(labels, SquareMatrix::zeros(2), Stage::Distance).unwrap();
        assert_eq!(m.get_by_label("A", "B"), Some(0.0));
        assert_eq!(m.get_by_label("A", "Z"), None);
    }
}
