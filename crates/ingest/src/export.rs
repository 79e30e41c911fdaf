//! Delimited-text export of the results and explanation tables.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use sentinel_core::{Batch, ExplanationResult, SentinelError, BLOCK_ID_COLUMN};
use tracing::info;

pub const RECONSTRUCTION_ERROR_COLUMN: &str = "Reconstruction Error";
pub const PREDICTION_COLUMN: &str = "Prediction";
pub const SEVERITY_COLUMN: &str = "Severity";

fn export_err(e: arrow::error::ArrowError) -> SentinelError {
    SentinelError::Export(e.to_string())
}

/// `BlockId`, every feature column, then error, prediction and severity.
/// Severity is null (blank in CSV) for normal records.
pub fn results_record_batch(batch: &Batch) -> Result<RecordBatch, SentinelError> {
    let records = &batch.records;

    let mut fields = vec![Field::new(BLOCK_ID_COLUMN, DataType::Utf8, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.block_id().as_str()),
    ))];

    for (i, name) in batch.feature_names.iter().enumerate() {
        fields.push(Field::new(name, DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.record.features.get(i).copied().unwrap_or(0.0)),
        )));
    }

    fields.push(Field::new(RECONSTRUCTION_ERROR_COLUMN, DataType::Float64, false));
    columns.push(Arc::new(Float64Array::from_iter_values(
        records.iter().map(|r| r.reconstruction_error),
    )));

    fields.push(Field::new(PREDICTION_COLUMN, DataType::Utf8, false));
    columns.push(Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.prediction.as_str()),
    )));

    fields.push(Field::new(SEVERITY_COLUMN, DataType::Utf8, true));
    columns.push(Arc::new(StringArray::from_iter(
        records.iter().map(|r| r.severity.map(|s| s.as_str())),
    )));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(export_err)
}

/// `BlockId`, `Reason`, `Severity`, `Suggested Action`.
pub fn explanations_record_batch(
    explanations: &[ExplanationResult],
) -> Result<RecordBatch, SentinelError> {
    let schema = Schema::new(vec![
        Field::new(BLOCK_ID_COLUMN, DataType::Utf8, false),
        Field::new("Reason", DataType::Utf8, false),
        Field::new(SEVERITY_COLUMN, DataType::Utf8, false),
        Field::new("Suggested Action", DataType::Utf8, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            explanations.iter().map(|e| e.block_id.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            explanations.iter().map(|e| e.reason.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            explanations.iter().map(|e| e.severity.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            explanations.iter().map(|e| e.suggested_action.as_str()),
        )),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).map_err(export_err)
}

pub fn write_csv<W: Write>(writer: W, batch: &RecordBatch) -> Result<(), SentinelError> {
    let mut csv = WriterBuilder::new().with_header(true).build(writer);
    csv.write(batch).map_err(export_err)
}

pub fn write_results(path: &Path, batch: &Batch) -> Result<(), SentinelError> {
    let file = File::create(path)?;
    write_csv(file, &results_record_batch(batch)?)?;
    info!("Wrote {} result rows to {}", batch.records.len(), path.display());
    Ok(())
}

pub fn write_explanations(
    path: &Path,
    explanations: &[ExplanationResult],
) -> Result<(), SentinelError> {
    let file = File::create(path)?;
    write_csv(file, &explanations_record_batch(explanations)?)?;
    info!("Wrote {} explanation rows to {}", explanations.len(), path.display());
    Ok(())
}
