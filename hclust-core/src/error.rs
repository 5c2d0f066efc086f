//! Error taxonomy for the distance → MST → ultrametric pipeline.
//!
//! Every core error is terminal for the computation that raised it. There is
//! no partial result and no retry; callers that want to survive bad labels must
//! filter the label set before entering the core.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Correlation,
    Distance,
    SpanningTree,
    Predecessors,
    Ultrametric,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Correlation => "correlation",
            Stage::Distance => "distance",
            Stage::SpanningTree => "spanning_tree",
            Stage::Predecessors => "predecessors",
            Stage::Ultrametric => "ultrametric",
        };
        f.write_str(name)
    }
}

/// Structured core errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Malformed correlation or distance matrix (shape, symmetry, range, NaN).
    #[error("invalid input at {stage} stage: {reason}")]
    InvalidInput { stage: Stage, reason: String },

    /// The distance graph has more than one component.
    #[error(
        "disconnected graph at {stage} stage: {} label(s) unreachable from '{root}': {}",
        unreachable.len(),
        unreachable.join(", ")
    )]
    DisconnectedGraph {
        stage: Stage,
        root: String,
        unreachable: Vec<String>,
    },

    /// A path or ultrametric query named a label the predecessor table does not cover.
    #[error("invalid pair ('{from}', '{to}') at {stage} stage: label not present in predecessor table")]
    InvalidPair {
        stage: Stage,
        from: String,
        to: String,
    },
}

impl CoreError {
    pub fn invalid_input(stage: Stage, reason: impl Into<String>) -> Self {
        CoreError::InvalidInput {
            stage,
            reason: reason.into(),
        }
    }

    /// The stage that failed, when the error is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CoreError::InvalidInput { stage, .. }
            | CoreError::DisconnectedGraph { stage, .. }
            | CoreError::InvalidPair { stage, .. } => Some(*stage),
        }
    }
}
