//! Serializable analysis configuration loaded from TOML.
//!
//! ```toml
//! [analysis]
//! symbols = ["XOM", "CVX", "AAPL", "MSFT"]
//! start = "2020-01-01"
//! end = "2023-12-31"          # optional, defaults to today
//! na_policy = "drop_series"   # or "pairwise_complete"
//!
//! [source]
//! kind = "csv"                # "yahoo" | "csv" | "synthetic"
//! path = "prices.csv"
//! ```

use chrono::NaiveDate;
use hclust_core::data::ReturnRequest;
use hclust_core::{LabelSet, NaPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Content-addressable analysis identifier (BLAKE3 hex).
pub type AnalysisId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub na_policy: NaPolicy,
}

/// Where prices come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    #[default]
    Yahoo,
    Csv {
        path: PathBuf,
    },
    Synthetic {
        #[serde(default)]
        seed: u64,
    },
}

impl SourceConfig {
    /// Stable description used in analysis ids and reports.
    pub fn tag(&self) -> String {
        match self {
            SourceConfig::Yahoo => "yahoo".to_string(),
            SourceConfig::Csv { path } => format!("csv:{}", path.display()),
            SourceConfig::Synthetic { seed } => format!("synthetic:{seed}"),
        }
    }
}

impl AnalysisConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if LabelSet::dedup(self.analysis.symbols.iter().cloned()).is_empty() {
            return Err(ConfigError::Invalid("analysis.symbols is empty".into()));
        }
        if let Some(end) = self.analysis.end {
            if end < self.analysis.start {
                return Err(ConfigError::Invalid(format!(
                    "analysis.end {end} is before analysis.start {}",
                    self.analysis.start
                )));
            }
        }
        if let SourceConfig::Csv { path } = &self.source {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("source.path is empty".into()));
            }
        }
        Ok(())
    }

    pub fn to_request(&self) -> ReturnRequest {
        ReturnRequest::new(
            self.analysis.symbols.clone(),
            self.analysis.start,
            self.analysis.end,
            self.analysis.na_policy,
        )
    }

    /// Identical configs, up to symbol order, share an id.
    pub fn analysis_id(&self) -> AnalysisId {
        request_id(&self.source.tag(), &self.to_request())
    }
}

/// BLAKE3 over the canonical JSON of a request from a given source.
///
/// Symbols are sorted so the id does not depend on their order.
pub fn request_id(source: &str, req: &ReturnRequest) -> AnalysisId {
    let symbols: BTreeSet<&str> = req.symbols.iter().map(String::as_str).collect();
    let canonical = serde_json::json!({
        "source": source,
        "symbols": symbols,
        "start": req.start.to_string(),
        "end": req.end.map(|d| d.to_string()),
        "na_policy": req.na_policy.as_str(),
    });
    blake3::hash(canonical.to_string().as_bytes())
        .to_hex()
        .to_string()
}
