//! Correlation matrices and the correlation routines that produce them.
//!
//! The pipeline accepts any `CorrelationEstimator`; `Pearson` is the default.

use crate::domain::{LabelSet, LabeledMatrix, ReturnTable, SquareMatrix};
use crate::error::{CoreError, Stage};
use std::sync::Arc;

/// Maximum tolerated `|m[i][j] - m[j][i]|` for matrices that should be symmetric.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Correlations beyond ±1 by at most this much are treated as ±1.
pub const RANGE_TOLERANCE: f64 = 1e-12;

/// Minimum overlapping observations for a pairwise correlation.
pub const MIN_OBSERVATIONS: usize = 2;

/// Validated correlation matrix: symmetric, unit diagonal, entries in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    inner: LabeledMatrix,
}

impl CorrelationMatrix {
    pub fn new(labels: Arc<LabelSet>, values: SquareMatrix) -> Result<Self, CoreError> {
        let stage = Stage::Correlation;
        let inner = LabeledMatrix::new(labels, values, stage)?;
        let labels = inner.labels();
        let m = inner.values();

        if m.dim() == 0 {
            return Err(CoreError::invalid_input(stage, "correlation matrix is empty"));
        }

        for i in 0..m.dim() {
            for j in 0..m.dim() {
                let rho = m.get(i, j);
                if rho.is_nan() {
                    return Err(CoreError::invalid_input(
                        stage,
                        format!("correlation ({}, {}) is NaN", labels.name(i), labels.name(j)),
                    ));
                }
                if rho.abs() > 1.0 + RANGE_TOLERANCE {
                    return Err(CoreError::invalid_input(
                        stage,
                        format!(
                            "correlation ({}, {}) = {rho} is outside [-1, 1]",
                            labels.name(i),
                            labels.name(j)
                        ),
                    ));
                }
            }
            let diag = m.get(i, i);
            if (diag - 1.0).abs() > SYMMETRY_TOLERANCE {
                return Err(CoreError::invalid_input(
                    stage,
                    format!("diagonal entry for '{}' is {diag}, expected 1", labels.name(i)),
                ));
            }
        }

        let asym = m.max_asymmetry();
        if asym > SYMMETRY_TOLERANCE {
            return Err(CoreError::invalid_input(
                stage,
                format!("matrix is not symmetric (max asymmetry {asym:e})"),
            ));
        }

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

    /// Correlation clamped to [-1, 1]; out-of-range values were rejected at construction.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.inner.get(i, j).clamp(-1.0, 1.0)
    }
}

/// Caller-supplied correlation routine.
pub trait CorrelationEstimator: Send + Sync {
    fn name(&self) -> &str;

    fn correlate(&self, returns: &ReturnTable) -> Result<CorrelationMatrix, CoreError>;
}

/// Pearson correlation over pairwise-complete observations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pearson;

impl CorrelationEstimator for Pearson {
    fn name(&self) -> &str {
        "pearson"
    }

    fn correlate(&self, returns: &ReturnTable) -> Result<CorrelationMatrix, CoreError> {
        let labels = returns.labels().clone();
        let n = labels.len();
        let mut values = SquareMatrix::zeros(n);

        for i in 0..n {
            values.set(i, i, 1.0);
            for j in (i + 1)..n {
                let rho = pearson_pairwise(returns.column(i), returns.column(j)).ok_or_else(|| {
                    CoreError::invalid_input(
                        Stage::Correlation,
                        format!(
                            "correlation ({}, {}) is undefined: fewer than {MIN_OBSERVATIONS} \
                             overlapping observations or a constant series",
                            labels.name(i),
                            labels.name(j)
                        ),
                    )
                })?;
                values.set(i, j, rho);
                values.set(j, i, rho);
            }
        }

        CorrelationMatrix::new(labels, values)
    }
}

/// Pearson correlation of two series, skipping positions where either is NaN.
///
/// Returns `None` when fewer than `MIN_OBSERVATIONS` pairs overlap or a side has
/// zero variance over the overlap.
pub fn pearson_pairwise(x: &[f64], y: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .collect();

    if pairs.len() < MIN_OBSERVATIONS {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }

    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}
