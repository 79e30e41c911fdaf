//! Batch runner behind the `sentinel` binary: ingest, score, explain, report.

pub mod cli;
pub mod report;
pub mod run;

pub use run::{run_batch, score_tables, RunOutcome};
