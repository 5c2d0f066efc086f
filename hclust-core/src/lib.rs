//! Hierarchical clustering core: correlation → distance → minimum spanning tree
//! → subdominant ultrametric.
//!
//! - Domain types (labels, square matrices, return tables)
//! - Distance matrix builder `d = sqrt(2 (1 - rho))`
//! - Kruskal MST with a label-ordered tie-break
//! - All-pairs predecessor table over the tree
//! - Subdominant ultrametric and the condensed vector for linkage tools
//! - Price acquisition collaborators under [`data`]

pub mod correlation;
pub mod data;
pub mod distance;
pub mod domain;
pub mod error;
pub mod linkage;
pub mod mst;
pub mod pipeline;
pub mod predecessor;
pub mod ultrametric;

pub use correlation::{CorrelationEstimator, CorrelationMatrix, Pearson};
pub use distance::DistanceMatrix;
pub use domain::{LabelSet, LabeledMatrix, NaPolicy, ReturnTable, SquareMatrix};
pub use error::{CoreError, Stage};
pub use linkage::CondensedDistances;
pub use mst::{minimum_spanning_tree, SpanningTree, TreeEdge};
pub use pipeline::HierarchyPipeline;
pub use predecessor::PredecessorTable;
pub use ultrametric::{subdominant_ultrametric, ultrametric_distance, UltrametricMatrix};
