//! Report export: JSON and CSV artifacts.
//!
//! All persisted reports carry a `schema_version`; newer versions are rejected
//! on load. Matrix CSVs are labelled on both axes and can be read back with
//! [`read_labeled_matrix_csv`] as input to `hclust matrix`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hclust_core::{LabelSet, SquareMatrix, Stage};

use crate::report::{AnalysisReport, ReportEdge, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize AnalysisReport to JSON")
}

/// Deserialize an `AnalysisReport`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<AnalysisReport> {
    let report: AnalysisReport =
        serde_json::from_str(json).context("failed to deserialize AnalysisReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Shortest text that parses back to the same `f64`.
fn format_value(v: f64) -> String {
    if v.is_finite() {
        format!("{v}")
    } else {
        "inf".to_string()
    }
}

/// Square matrix with a header row of labels and the label as first column.
/// Non-finite values are written as `inf`.
pub fn export_matrix_csv(labels: &[String], rows: &[Vec<f64>]) -> Result<String> {
    if rows.len() != labels.len() {
        bail!("{} rows for {} labels", rows.len(), labels.len());
    }
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = Vec::with_capacity(labels.len() + 1);
    header.push("label".to_string());
    header.extend(labels.iter().cloned());
    wtr.write_record(&header)?;

    for (label, row) in labels.iter().zip(rows) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(label.clone());
        record.extend(row.iter().map(|&v| format_value(v)));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_edges_csv(edges: &[ReportEdge]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["from", "to", "weight"])?;
    for e in edges {
        wtr.write_record([&e.from, &e.to, &format_value(e.weight)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Condensed vector with the label pair of every entry.
pub fn export_condensed_csv(labels: &[String], condensed: &[f64]) -> Result<String> {
    let n = labels.len();
    if condensed.len() != n * n.saturating_sub(1) / 2 {
        bail!(
            "condensed vector has {} entries, expected {} for {n} labels",
            condensed.len(),
            n * n.saturating_sub(1) / 2
        );
    }
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "from", "to", "value"])?;
    let pairs = (0..n).flat_map(|i| ((i + 1)..n).map(move |j| (i, j)));
    for (k, (i, j)) in pairs.enumerate() {
        wtr.write_record([
            &k.to_string(),
            &labels[i],
            &labels[j],
            &format_value(condensed[k]),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Parse a matrix written by [`export_matrix_csv`] (or any CSV with the same
/// layout). Row labels must match the header order; `inf` is accepted.
/// `stage` is the stage a shape error is reported against.
pub fn read_labeled_matrix_csv(path: &Path, stage: Stage) -> Result<(LabelSet, SquareMatrix)> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let header = rdr
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .clone();
    let labels: Vec<String> = header.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::with_capacity(labels.len());
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("bad CSV row {}", i + 1))?;
        let row_label = record.get(0).unwrap_or("").trim();
        match labels.get(i) {
            Some(expected) if expected == row_label => {}
            Some(expected) => {
                bail!("row {} is labelled '{row_label}', expected '{expected}'", i + 1)
            }
            None => bail!("more rows than header labels ({})", labels.len()),
        }
        let values = record
            .iter()
            .skip(1)
            .map(|cell| {
                cell.trim()
                    .parse::<f64>()
                    .with_context(|| format!("row '{row_label}': '{cell}' is not a number"))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(values);
    }

    let labels = LabelSet::new(labels)?;
    let matrix = SquareMatrix::from_rows(rows, stage)?;
    if matrix.dim() != labels.len() {
        bail!(
            "{} labels in header but {} matrix rows",
            labels.len(),
            matrix.dim()
        );
    }
    Ok((labels, matrix))
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one report.
///
/// Creates `{id prefix}_{timestamp}/` under `output_dir` containing:
/// - `report.json`: the full `AnalysisReport`
/// - `distance.csv`, `ultrametric.csv`: labelled matrices
/// - `mst_edges.csv`: tree edges in acceptance order
/// - `condensed.csv`: the condensed ultrametric vector
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &AnalysisReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = report.id.chars().take(12).collect();
    let dirname = format!(
        "{prefix}_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |name: &str, contents: String| -> Result<()> {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    };

    write("report.json", export_json(report)?)?;
    write(
        "distance.csv",
        export_matrix_csv(&report.labels, &report.distance_rows())?,
    )?;
    write(
        "ultrametric.csv",
        export_matrix_csv(&report.labels, &report.ultrametric)?,
    )?;
    write("mst_edges.csv", export_edges_csv(&report.mst_edges)?)?;
    write(
        "condensed.csv",
        export_condensed_csv(&report.labels, &report.condensed)?,
    )?;

    Ok(run_dir)
}

/// Load a report from an artifact directory's `report.json`.
pub fn load_artifacts(dir: &Path) -> Result<AnalysisReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
