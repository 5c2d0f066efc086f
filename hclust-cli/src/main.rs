//! hclust CLI: correlation hierarchies for symbol universes.
//!
//! Commands:
//! - `analyze`: load prices (Yahoo, CSV/Parquet, or synthetic), build the MST
//!   and subdominant ultrametric, and save the artifact set
//! - `matrix`: run the same pipeline on a labelled correlation or distance CSV
//! - `show`: print a saved report, optionally the tree path between two labels

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use hclust_core::data::SyntheticProvider;
use hclust_core::{
    CorrelationMatrix, DistanceMatrix, HierarchyPipeline, LabelSet, NaPolicy, SquareMatrix, Stage,
};
use hclust_runner::{
    load_artifacts, read_labeled_matrix_csv, save_artifacts, AnalysisConfig, AnalysisReport,
    AnalysisSection, AnalysisSession, MatrixInput, SourceConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "hclust",
    about = "Hierarchical clustering of return series via minimum spanning trees"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Yahoo,
    Csv,
    Synthetic,
}

#[derive(Subcommand)]
enum Commands {
    /// Load prices for a symbol universe and build its hierarchy.
    Analyze {
        /// Path to a TOML analysis config. Overrides the other input flags.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbols, comma separated (e.g., SPY,QQQ,TLT).
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 3 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// drop_series or pairwise_complete.
        #[arg(long, default_value = "drop_series")]
        na_policy: NaPolicy,

        /// Price source.
        #[arg(long, value_enum, default_value_t = SourceKind::Yahoo)]
        source: SourceKind,

        /// Price file for `--source csv` (CSV or Parquet, wide format).
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Seed for `--source synthetic`.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Build the hierarchy from a labelled matrix CSV.
    Matrix {
        /// Correlation matrix CSV.
        #[arg(long, conflicts_with = "distance")]
        correlation: Option<PathBuf>,

        /// Distance matrix CSV (`inf` marks an absent edge).
        #[arg(long)]
        distance: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Print a saved report.
    Show {
        /// Artifact directory containing report.json.
        dir: PathBuf,

        /// Print the tree path between two labels (e.g., --path SPY,TLT).
        #[arg(long, value_delimiter = ',', num_args = 2)]
        path: Option<Vec<String>>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            config,
            symbols,
            start,
            end,
            na_policy,
            source,
            prices,
            seed,
            output_dir,
        } => {
            let config = match config {
                Some(path) => AnalysisConfig::from_file(&path)?,
                None => build_config(symbols, start, end, na_policy, source, prices, seed)?,
            };
            run_analyze(&config, output_dir)
        }
        Commands::Matrix {
            correlation,
            distance,
            output_dir,
        } => run_matrix_cmd(correlation, distance, output_dir),
        Commands::Show { dir, path } => run_show(dir, path),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

#[allow(clippy::too_many_arguments)]
fn build_config(
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    na_policy: NaPolicy,
    source: SourceKind,
    prices: Option<PathBuf>,
    seed: u64,
) -> Result<AnalysisConfig> {
    if symbols.is_empty() {
        bail!("one of --config or --symbols is required");
    }
    let start = match start.as_deref() {
        Some(s) => parse_date(s)?,
        None => chrono::Local::now().date_naive() - chrono::Duration::days(365 * 3),
    };
    let end = end.as_deref().map(parse_date).transpose()?;

    let source = match source {
        SourceKind::Yahoo => SourceConfig::Yahoo,
        SourceKind::Csv => match prices {
            Some(path) => SourceConfig::Csv { path },
            None => bail!("--source csv requires --prices"),
        },
        SourceKind::Synthetic => SourceConfig::Synthetic { seed },
    };

    let config = AnalysisConfig {
        analysis: AnalysisSection {
            symbols,
            start,
            end,
            na_policy,
        },
        source,
    };
    config.validate()?;
    Ok(config)
}

fn run_analyze(config: &AnalysisConfig, output_dir: PathBuf) -> Result<()> {
    info!(
        id = %config.analysis_id(),
        symbols = config.analysis.symbols.len(),
        source = %config.source.tag(),
        "starting analysis"
    );
    let mut session = AnalysisSession::from_config(config)?;
    let report = session.run_config(config)?;

    print_summary(&report);

    let run_dir = save_artifacts(&report, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_matrix_cmd(
    correlation: Option<PathBuf>,
    distance: Option<PathBuf>,
    output_dir: PathBuf,
) -> Result<()> {
    let input = match (correlation, distance) {
        (Some(path), None) => {
            let (labels, values) = read_labeled_matrix_csv(&path, Stage::Correlation)?;
            MatrixInput::Correlation(CorrelationMatrix::new(Arc::new(labels), values)?)
        }
        (None, Some(path)) => {
            let (labels, values) = read_labeled_matrix_csv(&path, Stage::Distance)?;
            MatrixInput::Distance(DistanceMatrix::new(Arc::new(labels), values)?)
        }
        _ => bail!("exactly one of --correlation or --distance is required"),
    };

    // Matrix input never touches the provider.
    let mut session = AnalysisSession::new(Box::new(SyntheticProvider::new(0)));
    let report = session.run_matrix(input)?;

    print_summary(&report);

    let run_dir = save_artifacts(&report, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_show(dir: PathBuf, path: Option<Vec<String>>) -> Result<()> {
    let report = load_artifacts(&dir)?;
    print_summary(&report);

    if let Some(pair) = path {
        let [from, to] = pair.as_slice() else {
            bail!("--path takes exactly two labels");
        };
        let pipeline = rebuild_pipeline(&report)?;
        let hops = pipeline.path(from, to)?;
        let height = pipeline.ultrametric_between(from, to)?;
        println!();
        println!("Path {from} -> {to}: {}", hops.join(" -> "));
        println!("Merge height:      {height:.4}");
    }
    Ok(())
}

/// Recompute the pipeline from a report's stored distances.
fn rebuild_pipeline(report: &AnalysisReport) -> Result<HierarchyPipeline> {
    let labels = Arc::new(LabelSet::new(report.labels.iter().cloned())?);
    let values = SquareMatrix::from_rows(report.distance_rows(), Stage::Distance)?;
    Ok(HierarchyPipeline::from_distances(DistanceMatrix::new(labels, values)?)?)
}

fn print_summary(report: &AnalysisReport) {
    println!();
    println!("=== Hierarchy Summary ===");
    println!("Source:          {}", report.source);
    println!("Labels:          {}", report.label_count());
    if !report.dropped.is_empty() {
        println!("Dropped:         {}", report.dropped.join(", "));
    }
    if report.observations > 0 {
        println!("Observations:    {}", report.observations);
    }
    println!("MST weight:      {:.4}", report.total_weight);
    println!("Max violation:   {:.2e}", report.max_violation);
    println!();
    println!("MST edges (acceptance order):");
    for edge in &report.mst_edges {
        println!("  {:<10} {:<10} {:.4}", edge.from, edge.to, edge.weight);
    }
    println!();
}
