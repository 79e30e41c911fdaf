use std::path::Path;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sentinel_core::SentinelError;
use tracing::info;

use crate::table::Table;

pub struct ParquetImporter;

impl ParquetImporter {
    pub fn import(path: &Path) -> Result<Table, SentinelError> {
        let source = path.display().to_string();
        let parse_err = |reason: String| SentinelError::Parse {
            path: source.clone(),
            reason,
        };

        let file = std::fs::File::open(path).map_err(SentinelError::Io)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| parse_err(e.to_string()))?;
        let schema = builder.schema().clone();

        let reader = builder.build().map_err(|e| parse_err(e.to_string()))?;

        let mut batches = Vec::new();
        for batch_result in reader {
            batches.push(batch_result.map_err(|e| parse_err(e.to_string()))?);
        }

        let table = Table::from_record_batches(source.clone(), &schema, batches)?;
        info!(
            "Imported {} rows x {} columns from {}",
            table.num_rows(),
            table.columns.len(),
            path.display()
        );
        Ok(table)
    }
}
