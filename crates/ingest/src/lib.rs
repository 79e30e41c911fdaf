//! Table ingestion, normalization into feature records, and CSV export.

pub mod csv_import;
pub mod export;
pub mod normalize;
pub mod parquet_import;
pub mod table;

use std::path::Path;

use sentinel_core::SentinelError;

pub use csv_import::CsvImporter;
pub use normalize::{normalize, NormalizeReport, NormalizedBatch};
pub use parquet_import::ParquetImporter;
pub use table::{Column, ColumnData, Table};

/// Read one input table, picking the reader from the file extension.
/// Anything that is not Parquet is read as CSV.
pub fn read_table(path: &Path) -> Result<Table, SentinelError> {
    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("parquet") || e.eq_ignore_ascii_case("pq"))
        .unwrap_or(false);

    if is_parquet {
        ParquetImporter::import(path)
    } else {
        CsvImporter::import(path)
    }
}
