//! Analysis session: one provider, one return cache, one result cache.
//!
//! A session is the unit of memoization. Nothing is cached process-wide;
//! dropping the session drops every cached table and report.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use hclust_core::data::{
    load_returns, CircuitBreaker, CsvPriceProvider, DataError, PriceProvider, ReturnCache,
    ReturnRequest, SyntheticProvider, YahooProvider,
};
use hclust_core::{
    CoreError, CorrelationEstimator, CorrelationMatrix, DistanceMatrix, HierarchyPipeline, Pearson,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{request_id, AnalysisConfig, AnalysisId, ConfigError, SourceConfig};
use crate::report::{AnalysisReport, Provenance};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("analysis failed: {0}")]
    Core(#[from] CoreError),
}

/// Matrix supplied directly instead of being derived from prices.
#[derive(Debug, Clone)]
pub enum MatrixInput {
    Correlation(CorrelationMatrix),
    Distance(DistanceMatrix),
}

impl MatrixInput {
    fn kind(&self) -> &'static str {
        match self {
            MatrixInput::Correlation(_) => "correlation",
            MatrixInput::Distance(_) => "distance",
        }
    }

    /// BLAKE3 over kind, labels, and value bits.
    fn content_hash(&self) -> String {
        let matrix = match self {
            MatrixInput::Correlation(c) => c.matrix(),
            MatrixInput::Distance(d) => d.matrix(),
        };
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.kind().as_bytes());
        for label in matrix.labels().iter() {
            hasher.update(label.as_bytes());
            hasher.update(&[0]);
        }
        for row in matrix.values().to_rows() {
            for v in row {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

pub struct AnalysisSession {
    provider: Box<dyn PriceProvider>,
    source_tag: String,
    estimator: Box<dyn CorrelationEstimator>,
    returns: ReturnCache,
    reports: HashMap<AnalysisId, Arc<AnalysisReport>>,
}

impl AnalysisSession {
    /// Session over `provider` with the Pearson estimator.
    pub fn new(provider: Box<dyn PriceProvider>) -> Self {
        let source_tag = provider.name().to_string();
        Self {
            provider,
            source_tag,
            estimator: Box::new(Pearson),
            returns: ReturnCache::new(),
            reports: HashMap::new(),
        }
    }

    /// Build the provider the config's `[source]` names.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let provider: Box<dyn PriceProvider> = match &config.source {
            SourceConfig::Yahoo => Box::new(YahooProvider::new(Arc::new(
                CircuitBreaker::default_provider(),
            ))?),
            SourceConfig::Csv { path } => Box::new(CsvPriceProvider::open(path)?),
            SourceConfig::Synthetic { seed } => Box::new(SyntheticProvider::new(*seed)),
        };
        let mut session = Self::new(provider);
        session.source_tag = config.source.tag();
        Ok(session)
    }

    pub fn with_estimator(mut self, estimator: Box<dyn CorrelationEstimator>) -> Self {
        self.estimator = estimator;
        self.reports.clear();
        self
    }

    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }

    pub fn return_cache(&self) -> &ReturnCache {
        &self.returns
    }

    pub fn cached_reports(&self) -> usize {
        self.reports.len()
    }

    /// Run the analysis a config describes. The config's source is not
    /// consulted; the session's provider is used.
    pub fn run_config(
        &mut self,
        config: &AnalysisConfig,
    ) -> Result<Arc<AnalysisReport>, SessionError> {
        config.validate()?;
        self.run(&config.to_request())
    }

    /// Load returns for `req`, run the pipeline, and cache the report.
    pub fn run(&mut self, req: &ReturnRequest) -> Result<Arc<AnalysisReport>, SessionError> {
        let id = request_id(&self.source_tag, req);
        if let Some(report) = self.reports.get(&id) {
            debug!(id = %id, "report cache hit");
            return Ok(Arc::clone(report));
        }

        let started = Instant::now();
        let loaded = load_returns(self.provider.as_ref(), &mut self.returns, req)?;
        let pipeline = HierarchyPipeline::from_returns(&loaded.table, self.estimator.as_ref())?;

        let provenance = Provenance {
            source: self.source_tag.clone(),
            dropped: loaded.dropped.clone(),
            observations: loaded.table.observations(),
            dataset_hash: loaded.dataset_hash.clone(),
        };
        let report = Arc::new(AnalysisReport::from_pipeline(id.clone(), &pipeline, provenance));

        info!(
            id = %id,
            labels = report.label_count(),
            dropped = report.dropped.len(),
            total_weight = report.total_weight,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );
        self.reports.insert(id, Arc::clone(&report));
        Ok(report)
    }

    /// Run the pipeline on a caller-supplied correlation or distance matrix.
    pub fn run_matrix(&mut self, input: MatrixInput) -> Result<Arc<AnalysisReport>, SessionError> {
        let dataset_hash = input.content_hash();
        let id: AnalysisId = blake3::hash(format!("matrix:{dataset_hash}").as_bytes())
            .to_hex()
            .to_string();
        if let Some(report) = self.reports.get(&id) {
            debug!(id = %id, "report cache hit");
            return Ok(Arc::clone(report));
        }

        let source = format!("{}_matrix", input.kind());
        let pipeline = match input {
            MatrixInput::Correlation(corr) => HierarchyPipeline::from_correlation(&corr)?,
            MatrixInput::Distance(d) => HierarchyPipeline::from_distances(d)?,
        };
        let provenance = Provenance {
            source,
            dropped: Vec::new(),
            observations: 0,
            dataset_hash,
        };
        let report = Arc::new(AnalysisReport::from_pipeline(id.clone(), &pipeline, provenance));
        info!(id = %id, labels = report.label_count(), "matrix analysis complete");
        self.reports.insert(id, Arc::clone(&report));
        Ok(report)
    }
}
