use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Results and explanations as two CSV files
    Csv,
    /// One JSON report with records, explanations and summary
    Json,
}

/// Log anomaly detector.
///
/// Scores every log record by autoencoder reconstruction error, buckets
/// anomalies into severity tiers and asks an LLM to explain one
/// representative anomaly per tier.
#[derive(Parser, Debug)]
#[command(name = "sentinel", version, about)]
pub struct CliArgs {
    /// Input table (CSV or Parquet). Repeat to concatenate several files.
    #[arg(short, long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Autoencoder weights file (overrides SENTINEL_MODEL_PATH)
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Anomaly threshold on reconstruction error (overrides SENTINEL_THRESHOLD)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Results output path
    #[arg(short, long, default_value = "results.csv")]
    pub output: PathBuf,

    /// Explanation table output path (CSV format only)
    #[arg(long, default_value = "explanations.csv")]
    pub explanations: PathBuf,

    /// Skip the LLM explanation step
    #[arg(long)]
    pub no_explain: bool,

    /// LLM provider: openai, anthropic or ollama (overrides LLM_PROVIDER)
    #[arg(long)]
    pub provider: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Config profile; keys are looked up as {PROFILE}_{KEY} first
    #[arg(long, env = "SENTINEL_PROFILE", default_value = "")]
    pub profile: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_are_repeatable() {
        let args = CliArgs::parse_from([
            "sentinel", "-i", "a.csv", "--input", "b.parquet", "--threshold", "15",
        ]);
        assert_eq!(args.inputs, vec![PathBuf::from("a.csv"), PathBuf::from("b.parquet")]);
        assert_eq!(args.threshold, Some(15.0));
        assert_eq!(args.format, OutputFormat::Csv);
        assert!(!args.no_explain);
    }

    #[test]
    fn at_least_one_input_is_required() {
        assert!(CliArgs::try_parse_from(["sentinel"]).is_err());
    }

    #[test]
    fn json_format_is_accepted() {
        let args =
            CliArgs::parse_from(["sentinel", "-i", "a.csv", "--format", "json", "--no-explain"]);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.no_explain);
    }
}
