//! Operator-facing output: JSON report and the console summary.

use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use sentinel_core::{BatchSummary, ExplanationResult, ScoredRecord, SentinelError};
use sentinel_ingest::{export, NormalizeReport};
use serde::Serialize;
use uuid::Uuid;

use crate::run::RunOutcome;

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub threshold: f64,
    pub summary: BatchSummary,
    pub normalization: &'a NormalizeReport,
    pub feature_names: &'a [String],
    pub records: &'a [ScoredRecord],
    pub explanations: &'a [ExplanationResult],
}

impl<'a> JsonReport<'a> {
    pub fn new(outcome: &'a RunOutcome) -> Self {
        let batch = &outcome.batch;
        Self {
            run_id: batch.id,
            started_at: batch.started_at,
            threshold: batch.threshold,
            summary: batch.summary(),
            normalization: &outcome.normalization,
            feature_names: &batch.feature_names,
            records: &batch.records,
            explanations: &batch.explanations,
        }
    }
}

pub fn write_json(path: &Path, outcome: &RunOutcome) -> Result<(), SentinelError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &JsonReport::new(outcome))
        .map_err(|e| SentinelError::Export(e.to_string()))?;
    tracing::info!("Wrote JSON report to {}", path.display());
    Ok(())
}

/// Write the results table and the explanation table. The explanation
/// table is always written, header-only when nothing was explained, so a
/// file from an earlier run never passes for this one.
pub fn write_csv(
    results_path: &Path,
    explanations_path: &Path,
    outcome: &RunOutcome,
) -> Result<(), SentinelError> {
    export::write_results(results_path, &outcome.batch)?;
    export::write_explanations(explanations_path, &outcome.batch.explanations)
}

/// Console summary: counts, normalizer notes, then the explanation rows.
pub fn render_summary(outcome: &RunOutcome) -> String {
    let summary = outcome.batch.summary();
    let norm = &outcome.normalization;
    let mut out = String::new();

    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "  Total logs:     {}", summary.total);
    let _ = writeln!(
        out,
        "  Anomalies:      {} (critical {}, major {}, minor {})",
        summary.anomalies, summary.critical, summary.major, summary.minor
    );
    let _ = writeln!(out, "  Normal entries: {}", summary.normal);

    if norm.filled_missing > 0 {
        let _ = writeln!(out, "  Missing values replaced with 0: {}", norm.filled_missing);
    }
    if !norm.dropped_columns.is_empty() {
        let _ = writeln!(
            out,
            "  Non-numeric columns ignored: {}",
            norm.dropped_columns.join(", ")
        );
    }

    if summary.anomalies == 0 {
        let _ = writeln!(out, "\nNo anomalies detected to analyze.");
        return out;
    }

    if !outcome.batch.explanations.is_empty() {
        let _ = writeln!(out, "\nExample results (1 per severity)");
        for e in &outcome.batch.explanations {
            let _ = writeln!(out, "  [{}] BlockId {}", e.severity, e.block_id);
            let _ = writeln!(out, "    Reason: {}", e.reason);
            let _ = writeln!(out, "    Suggested action: {}", e.suggested_action);
        }
    }
    out
}
