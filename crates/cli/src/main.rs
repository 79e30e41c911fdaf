use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use sentinel_cli::cli::{CliArgs, OutputFormat};
use sentinel_cli::report;
use sentinel_cli::run_batch;
use sentinel_compute::{AnomalyScorer, DenseAutoencoder};
use sentinel_core::config::{load_dotenv, Config};
use sentinel_llm::{ExplanationOrchestrator, StagedPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();
    let config = apply_overrides(Config::for_profile(&args.profile), &args);
    config.log_summary();

    let mut tables = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let table = sentinel_ingest::read_table(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        tables.push(table);
    }

    let model_path = &config.detection.model_path;
    let model = DenseAutoencoder::load(model_path)
        .with_context(|| format!("failed to load model {}", model_path.display()))?;
    let scorer = AnomalyScorer::new(Arc::new(model), config.detection.threshold);

    let orchestrator = build_orchestrator(&config);
    let outcome = run_batch(tables, &scorer, orchestrator.as_ref())
        .await
        .context("batch aborted")?;

    match args.format {
        OutputFormat::Csv => {
            report::write_csv(&args.output, &args.explanations, &outcome)
                .context("failed to write CSV output")?;
        }
        OutputFormat::Json => {
            let path = json_output_path(&args.output);
            report::write_json(&path, &outcome)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
    }

    print!("{}", report::render_summary(&outcome));
    Ok(())
}

/// CLI flags win over environment config.
fn apply_overrides(mut config: Config, args: &CliArgs) -> Config {
    if let Some(threshold) = args.threshold {
        config.detection.threshold = threshold;
    }
    if let Some(ref model) = args.model {
        config.detection.model_path = model.clone();
    }
    if let Some(ref provider) = args.provider {
        config.llm.provider = provider.to_lowercase();
    }
    if args.no_explain {
        config.explain.enabled = false;
    }
    config
}

/// A missing or unusable provider skips explanations; scoring still runs.
fn build_orchestrator(config: &Config) -> Option<ExplanationOrchestrator> {
    if !config.explain.enabled {
        return None;
    }
    if !config.llm.is_configured() {
        warn!(
            provider = %config.llm.provider,
            "LLM provider not configured, skipping explanations"
        );
        return None;
    }

    match StagedPipeline::from_config(config) {
        Ok(pipeline) => {
            // Three stages per sample, each bounded on its own.
            let per_sample = Duration::from_secs(config.explain.stage_timeout_secs.saturating_mul(3));
            Some(
                ExplanationOrchestrator::new(Arc::new(pipeline))
                    .with_max_concurrency(config.explain.max_concurrency)
                    .with_sample_timeout(per_sample),
            )
        }
        Err(e) => {
            warn!(error = %e, "Failed to create LLM provider, skipping explanations");
            None
        }
    }
}

/// `--format json` with the default CSV name writes `results.json` instead.
fn json_output_path(output: &std::path::Path) -> PathBuf {
    if output.extension().and_then(|e| e.to_str()) == Some("csv") {
        output.with_extension("json")
    } else {
        output.to_path_buf()
    }
}
