use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use sentinel_core::SentinelError;
use tracing::{debug, info};

use crate::table::Table;

/// Reads a headered CSV file into a typed [`Table`], inferring column types
/// from the whole file.
pub struct CsvImporter;

impl CsvImporter {
    pub fn import(path: &Path) -> Result<Table, SentinelError> {
        let file = File::open(path).map_err(SentinelError::Io)?;
        let table = Self::read(&path.display().to_string(), file)?;
        info!(
            "Imported {} rows x {} columns from {}",
            table.num_rows(),
            table.columns.len(),
            path.display()
        );
        Ok(table)
    }

    /// Read CSV from any seekable source. `source` labels errors.
    pub fn read<R: Read + Seek>(source: &str, mut reader: R) -> Result<Table, SentinelError> {
        let parse_err = |e: arrow::error::ArrowError| SentinelError::Parse {
            path: source.to_string(),
            reason: e.to_string(),
        };

        let format = Format::default().with_header(true);
        let (schema, records) = format.infer_schema(&mut reader, None).map_err(parse_err)?;
        debug!("Inferred schema for {} from {} records: {:?}", source, records, schema);
        reader.rewind().map_err(SentinelError::Io)?;

        let schema = Arc::new(schema);
        let csv = ReaderBuilder::new(schema.clone())
            .with_format(format)
            .build(reader)
            .map_err(parse_err)?;

        let batches = csv
            .collect::<Result<Vec<RecordBatch>, _>>()
            .map_err(parse_err)?;

        Table::from_record_batches(source, &schema, batches)
    }
}
