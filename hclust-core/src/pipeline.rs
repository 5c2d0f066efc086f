//! One pass through distance → MST → predecessors → ultrametric.
//!
//! Each stage runs exactly once and its output is kept, so later queries reuse
//! the same distance matrix and tree instead of rebuilding them.

use crate::correlation::{CorrelationEstimator, CorrelationMatrix};
use crate::distance::DistanceMatrix;
use crate::domain::{LabelSet, ReturnTable};
use crate::error::CoreError;
use crate::linkage::CondensedDistances;
use crate::mst::{minimum_spanning_tree, SpanningTree};
use crate::predecessor::PredecessorTable;
use crate::ultrametric::{subdominant_ultrametric, ultrametric_distance, UltrametricMatrix};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HierarchyPipeline {
    distances: DistanceMatrix,
    tree: SpanningTree,
    predecessors: PredecessorTable,
    ultrametric: UltrametricMatrix,
}

impl HierarchyPipeline {
    /// Correlate a return table with `estimator`, then run the pipeline.
    pub fn from_returns(
        returns: &ReturnTable,
        estimator: &dyn CorrelationEstimator,
    ) -> Result<Self, CoreError> {
        let started = Instant::now();
        let corr = estimator.correlate(returns)?;
        debug!(
            estimator = estimator.name(),
            labels = corr.dim(),
            observations = returns.observations(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "correlation matrix built"
        );
        Self::from_correlation(&corr)
    }

    pub fn from_correlation(corr: &CorrelationMatrix) -> Result<Self, CoreError> {
        let started = Instant::now();
        let distances = DistanceMatrix::from_correlation(corr)?;
        debug!(
            labels = distances.dim(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "distance matrix built"
        );
        Self::from_distances(distances)
    }

    pub fn from_distances(distances: DistanceMatrix) -> Result<Self, CoreError> {
        let started = Instant::now();
        let tree = minimum_spanning_tree(&distances)?;
        debug!(
            edges = tree.edges().len(),
            total_weight = tree.total_weight(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "spanning tree built"
        );

        let started = Instant::now();
        let predecessors = PredecessorTable::from_tree(&tree);
        debug!(
            sources = predecessors.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "predecessor table built"
        );

        let started = Instant::now();
        let ultrametric = subdominant_ultrametric(&distances, &predecessors)?;
        debug!(
            labels = ultrametric.dim(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "ultrametric matrix built"
        );

        Ok(Self {
            distances,
            tree,
            predecessors,
            ultrametric,
        })
    }

    pub fn labels(&self) -> &Arc<LabelSet> {
        self.distances.labels()
    }

    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    pub fn tree(&self) -> &SpanningTree {
        &self.tree
    }

    pub fn predecessors(&self) -> &PredecessorTable {
        &self.predecessors
    }

    pub fn ultrametric(&self) -> &UltrametricMatrix {
        &self.ultrametric
    }

    pub fn condensed(&self) -> CondensedDistances {
        CondensedDistances::from_ultrametric(&self.ultrametric)
    }

    /// Tree path between two labels. Equal labels give a single-node path.
    pub fn path(&self, from: &str, to: &str) -> Result<Vec<String>, CoreError> {
        if from == to && self.labels().contains(from) {
            return Ok(vec![from.to_string()]);
        }
        self.predecessors.path_by_label(from, to)
    }

    /// Recompute one pair from the tree; agrees with `ultrametric().get_by_label`.
    pub fn ultrametric_between(&self, from: &str, to: &str) -> Result<f64, CoreError> {
        ultrametric_distance(&self.distances, &self.predecessors, from, to)
    }
}
