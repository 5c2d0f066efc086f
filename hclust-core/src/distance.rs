//! Correlation → metric distance, `d = sqrt(2 (1 - rho))`.
//!
//! Distances lie in [0, 2]. The diagonal is forced to exactly zero so that
//! floating-point correlations of 0.9999999999 on the diagonal do not leak into
//! the graph as tiny self-edges.

use crate::correlation::{CorrelationMatrix, SYMMETRY_TOLERANCE};
use crate::domain::{LabelSet, LabeledMatrix, SquareMatrix};
use crate::error::{CoreError, Stage};
use std::sync::Arc;

/// Symmetric, non-negative distance matrix with a zero diagonal.
///
/// `+inf` marks an absent edge. Only distances built from a correlation matrix
/// are guaranteed to be metric.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    inner: LabeledMatrix,
}

impl DistanceMatrix {
    pub fn from_correlation(corr: &CorrelationMatrix) -> Result<Self, CoreError> {
        let n = corr.dim();
        let values = SquareMatrix::from_fn(n, |i, j| {
            if i == j {
                0.0
            } else {
                correlation_distance(corr.get(i, j))
            }
        });
        let inner = LabeledMatrix::new(corr.labels().clone(), values, Stage::Distance)?;
        Ok(Self { inner })
    }

    /// Accept caller-supplied distances.
    ///
    /// The upper triangle is authoritative; the result mirrors it onto the lower
    /// triangle and sets the diagonal to zero.
    pub fn new(labels: Arc<LabelSet>, values: SquareMatrix) -> Result<Self, CoreError> {
        let stage = Stage::Distance;
        let raw = LabeledMatrix::new(labels, values, stage)?;
        let m = raw.values();
        let labels = raw.labels();

        if m.dim() == 0 {
            return Err(CoreError::invalid_input(stage, "distance matrix is empty"));
        }

        for i in 0..m.dim() {
            for j in 0..m.dim() {
                let d = m.get(i, j);
                if d.is_nan() {
                    return Err(CoreError::invalid_input(
                        stage,
                        format!("distance ({}, {}) is NaN", labels.name(i), labels.name(j)),
                    ));
                }
                if d < 0.0 {
                    return Err(CoreError::invalid_input(
                        stage,
                        format!(
                            "distance ({}, {}) = {d} is negative",
                            labels.name(i),
                            labels.name(j)
                        ),
                    ));
                }
            }
            let diag = m.get(i, i);
            if diag > SYMMETRY_TOLERANCE {
                return Err(CoreError::invalid_input(
                    stage,
                    format!("diagonal entry for '{}' is {diag}, expected 0", labels.name(i)),
                ));
            }
        }

        let asym = m.max_asymmetry();
        if asym.is_nan() || asym > SYMMETRY_TOLERANCE {
            return Err(CoreError::invalid_input(
                stage,
                format!("matrix is not symmetric (max asymmetry {asym:e})"),
            ));
        }

        // `-0.0 + 0.0` is `+0.0`; edge ordering uses `total_cmp`, which splits the two.
        let mirrored = m.mirrored_upper(0.0);
        let values = SquareMatrix::from_fn(m.dim(), |i, j| mirrored.get(i, j) + 0.0);
        let inner = LabeledMatrix::new(labels.clone(), values, stage)?;
        Ok(Self { inner })
    }

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
}

/// `sqrt(2 (1 - rho))` for a correlation already known to be in [-1, 1].
#[inline]
pub fn correlation_distance(rho: f64) -> f64 {
    (2.0 * (1.0 - rho)).max(0.0).sqrt()
}
