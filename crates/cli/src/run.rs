use sentinel_compute::AnomalyScorer;
use sentinel_core::{Batch, SentinelError};
use sentinel_ingest::{normalize, NormalizeReport, Table};
use sentinel_llm::ExplanationOrchestrator;
use tracing::info;

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub batch: Batch,
    pub normalization: NormalizeReport,
}

/// Normalize and score. Any schema or model problem aborts the batch.
pub fn score_tables(
    tables: Vec<Table>,
    scorer: &AnomalyScorer,
) -> Result<RunOutcome, SentinelError> {
    let normalized = normalize(tables)?;
    let records = scorer.score(normalized.records)?;
    Ok(RunOutcome {
        batch: Batch::new(scorer.threshold(), normalized.feature_names, records),
        normalization: normalized.report,
    })
}

/// Full run: score every record, then explain one anomaly per tier when an
/// orchestrator is given. Explanation failures never fail the run.
pub async fn run_batch(
    tables: Vec<Table>,
    scorer: &AnomalyScorer,
    orchestrator: Option<&ExplanationOrchestrator>,
) -> Result<RunOutcome, SentinelError> {
    let mut outcome = score_tables(tables, scorer)?;

    if let Some(orchestrator) = orchestrator {
        outcome.batch.explanations = orchestrator.explain(&outcome.batch.records).await;
    } else {
        info!("Explanations disabled");
    }

    Ok(outcome)
}
