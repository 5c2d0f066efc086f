//! hclust runner: analysis sessions, result caching, and artifact export.
//!
//! This crate builds on `hclust-core` to provide:
//! - TOML analysis configs with content-addressed ids
//! - `AnalysisSession`, which memoizes return tables and finished reports
//! - Serializable `AnalysisReport` with provenance
//! - JSON and CSV artifact export

pub mod config;
pub mod export;
pub mod report;
pub mod session;

pub use config::{request_id, AnalysisConfig, AnalysisId, AnalysisSection, ConfigError, SourceConfig};
pub use export::{
    export_condensed_csv, export_edges_csv, export_json, export_matrix_csv, import_json,
    load_artifacts, read_labeled_matrix_csv, save_artifacts,
};
pub use report::{AnalysisReport, Provenance, ReportEdge, SCHEMA_VERSION};
pub use session::{AnalysisSession, MatrixInput, SessionError};
