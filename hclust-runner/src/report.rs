//! Serializable result of one analysis.

use chrono::{DateTime, Utc};
use hclust_core::HierarchyPipeline;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisId;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// One MST edge by label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEdge {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

/// Where the input came from and what was left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub source: String,
    pub dropped: Vec<String>,
    pub observations: usize,
    pub dataset_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub id: AnalysisId,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub labels: Vec<String>,
    /// Requested symbols that did not make it into the analysis.
    pub dropped: Vec<String>,
    /// Return observations behind the correlations; 0 for matrix input.
    pub observations: usize,
    pub dataset_hash: String,
    /// Row-major distances. `None` marks an absent edge (infinite distance).
    pub distances: Vec<Vec<Option<f64>>>,
    /// MST edges in acceptance order.
    pub mst_edges: Vec<ReportEdge>,
    pub total_weight: f64,
    pub ultrametric: Vec<Vec<f64>>,
    /// Upper triangle of `ultrametric`, row-major, for linkage tools.
    pub condensed: Vec<f64>,
    pub max_violation: f64,
}

impl AnalysisReport {
    pub fn from_pipeline(id: AnalysisId, pipeline: &HierarchyPipeline, provenance: Provenance) -> Self {
        let distances = pipeline
            .distances()
            .matrix()
            .values()
            .to_rows()
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.is_finite().then_some(v)).collect())
            .collect();

        let mst_edges = pipeline
            .tree()
            .labeled_edges()
            .map(|(from, to, weight)| ReportEdge {
                from: from.to_string(),
                to: to.to_string(),
                weight,
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            id,
            generated_at: Utc::now(),
            source: provenance.source,
            labels: pipeline.labels().to_vec(),
            dropped: provenance.dropped,
            observations: provenance.observations,
            dataset_hash: provenance.dataset_hash,
            distances,
            mst_edges,
            total_weight: pipeline.tree().total_weight(),
            ultrametric: pipeline.ultrametric().matrix().values().to_rows(),
            condensed: pipeline.condensed().values,
            max_violation: pipeline.ultrametric().max_violation(),
        }
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Ultrametric distance between two labels, if both are present.
    pub fn ultrametric_between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        Some(self.ultrametric[i][j])
    }

    /// Distances with absent edges restored to `+inf`.
    pub fn distance_rows(&self) -> Vec<Vec<f64>> {
        self.distances
            .iter()
            .map(|row| row.iter().map(|v| v.unwrap_or(f64::INFINITY)).collect())
            .collect()
    }
}
