//! Explanation orchestrator.
//!
//! Picks one representative anomaly per severity tier (the first in row
//! order), runs the explanation pipeline for each, and turns every outcome
//! into an [`ExplanationResult`]. A failing tier degrades to an inline error
//! string; it never aborts the other tiers.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use sentinel_core::{ExplanationResult, ScoredRecord, Severity, NOT_AVAILABLE};
use tracing::{info, warn};

use crate::pipeline::{BackendError, ExplanationPipeline};
use crate::sanitize::{sanitize_output, truncate_chars};
use crate::stages::{AnomalyContext, StageOutput};

/// Prefix of the `reason` field when a tier's pipeline failed.
pub const ERROR_INDICATOR: &str = "Explanation error:";

/// Longest failure cause embedded in the `reason` field, in characters.
pub const MAX_ERROR_CAUSE_CHARS: usize = 200;

/// Index of the reason output among the stage outputs.
const REASON_OUTPUT: usize = 0;
/// Index of the suggested action output. The severity stage (index 1) is
/// informational; the computed severity is authoritative.
const ACTION_OUTPUT: usize = 2;

/// First anomaly of each tier, ordered Critical, Major, Minor. Empty tiers
/// are omitted.
pub fn select_representatives(records: &[ScoredRecord]) -> Vec<(Severity, &ScoredRecord)> {
    Severity::REPORT_ORDER
        .iter()
        .filter_map(|&tier| {
            records
                .iter()
                .find(|r| r.is_anomaly() && r.severity == Some(tier))
                .map(|r| (tier, r))
        })
        .collect()
}

pub struct ExplanationOrchestrator {
    pipeline: Arc<dyn ExplanationPipeline>,
    max_concurrency: usize,
    sample_timeout: Option<Duration>,
}

impl ExplanationOrchestrator {
    pub fn new(pipeline: Arc<dyn ExplanationPipeline>) -> Self {
        Self {
            pipeline,
            max_concurrency: 1,
            sample_timeout: None,
        }
    }

    /// Allow up to `n` tier samples in flight at once. Output order is
    /// unaffected.
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    /// Bound a whole pipeline run for one sample.
    pub fn with_sample_timeout(mut self, timeout: Duration) -> Self {
        self.sample_timeout = Some(timeout);
        self
    }

    /// Explain one representative anomaly per populated tier.
    pub async fn explain(&self, records: &[ScoredRecord]) -> Vec<ExplanationResult> {
        let samples = select_representatives(records);
        if samples.is_empty() {
            info!("No anomalies to explain");
            return Vec::new();
        }

        info!(
            "Explaining {} representative anomalies (concurrency {})",
            samples.len(),
            self.max_concurrency
        );

        stream::iter(samples)
            .map(|(severity, record)| self.explain_one(severity, record))
            .buffered(self.max_concurrency)
            .collect::<Vec<_>>()
            .await
    }

    async fn explain_one(&self, severity: Severity, record: &ScoredRecord) -> ExplanationResult {
        let ctx = AnomalyContext::from_record(record);
        let outcome = match self.sample_timeout {
            Some(limit) => tokio::time::timeout(limit, self.pipeline.run(&ctx))
                .await
                .unwrap_or_else(|_| Err(BackendError::Timeout(limit))),
            None => self.pipeline.run(&ctx).await,
        };

        match &outcome {
            Ok(outputs) => info!(
                block_id = %ctx.block_id,
                severity = %severity,
                outputs = outputs.len(),
                "explanation complete"
            ),
            Err(e) => warn!(
                block_id = %ctx.block_id,
                severity = %severity,
                error = %e,
                "explanation failed, using degraded result"
            ),
        }

        assemble(record, severity, outcome)
    }
}

/// Map a pipeline outcome onto the result row.
///
/// Missing outputs leave the corresponding field at "N/A". A failure puts a
/// short error indicator in `reason` and "N/A" in `suggested_action`.
pub fn assemble(
    record: &ScoredRecord,
    severity: Severity,
    outcome: Result<Vec<StageOutput>, BackendError>,
) -> ExplanationResult {
    let (reason, suggested_action) = match outcome {
        Ok(outputs) => {
            let field = |idx: usize| {
                outputs
                    .get(idx)
                    .map(|o| sanitize_output(o.raw.as_deref()))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string())
            };
            (field(REASON_OUTPUT), field(ACTION_OUTPUT))
        }
        Err(e) => (error_indicator(&e), NOT_AVAILABLE.to_string()),
    };

    ExplanationResult {
        block_id: record.block_id().clone(),
        reason,
        severity,
        suggested_action,
    }
}

fn error_indicator(err: &BackendError) -> String {
    let cause = err.to_string();
    format!(
        "{} {}",
        ERROR_INDICATOR,
        truncate_chars(&cause, MAX_ERROR_CAUSE_CHARS)
    )
}
