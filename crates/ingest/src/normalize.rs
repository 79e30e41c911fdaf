//! Record normalizer: concatenate input tables and coerce them into a
//! fixed-width numeric matrix keyed by `BlockId`.
//!
//! Pipeline, in order:
//! 1. concatenate tables (same column set required, row order preserved)
//! 2. fill missing numeric cells with 0
//! 3. drop non-numeric feature columns
//! 4. take `BlockId` as the record key, synthesizing 1..=n if absent

use std::collections::HashSet;

use sentinel_core::{BlockId, LogRecord, SchemaError, BLOCK_ID_COLUMN};
use serde::Serialize;
use tracing::{info, warn};

use crate::table::{render_id, Column, ColumnData, Table};

/// What the normalizer changed on the way in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub source_tables: usize,
    pub rows: usize,
    /// Cells that were missing and replaced with 0.
    pub filled_missing: usize,
    pub dropped_columns: Vec<String>,
    pub synthesized_block_ids: bool,
}

/// Output of [`normalize`]: one record per input row, all with
/// `feature_names.len()` features.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub feature_names: Vec<String>,
    pub records: Vec<LogRecord>,
    pub report: NormalizeReport,
}

impl NormalizedBatch {
    pub fn width(&self) -> usize {
        self.feature_names.len()
    }
}

/// Concatenate tables in order. Later tables are re-ordered to the first
/// table's column order; a column that is text anywhere is text in the result.
pub fn concat_tables(tables: Vec<Table>) -> Result<Table, SchemaError> {
    let mut iter = tables.into_iter();
    let Some(mut combined) = iter.next() else {
        return Err(SchemaError::EmptyInput);
    };

    let expected = combined.column_names();
    let expected_set: HashSet<&String> = expected.iter().collect();

    for (offset, mut table) in iter.enumerate() {
        let found = table.column_names();
        let found_set: HashSet<&String> = found.iter().collect();
        if found_set != expected_set || found.len() != expected.len() {
            return Err(SchemaError::IncompatibleColumns {
                index: offset + 1,
                expected: expected.clone(),
                found,
            });
        }

        let mut merged = Vec::with_capacity(expected.len());
        for name in &expected {
            let Some(column) = combined.take_column(name) else {
                continue;
            };
            let Some(next) = table.take_column(name) else {
                continue;
            };
            let mut data = column.data;
            data.append(next.data);
            merged.push(Column {
                name: column.name,
                data,
            });
        }
        combined = Table::new(combined.source.clone(), merged).map_err(|_| {
            SchemaError::IncompatibleColumns {
                index: offset + 1,
                expected: expected.clone(),
                found: table.column_names(),
            }
        })?;
    }

    Ok(combined)
}

/// Validate and coerce uploaded tables into feature records.
pub fn normalize(tables: Vec<Table>) -> Result<NormalizedBatch, SchemaError> {
    let source_tables = tables.len();
    let mut table = concat_tables(tables)?;
    let rows = table.num_rows();
    if rows == 0 {
        return Err(SchemaError::EmptyInput);
    }

    let mut report = NormalizeReport {
        source_tables,
        rows,
        ..NormalizeReport::default()
    };

    let block_ids = table.take_column(BLOCK_ID_COLUMN);

    let mut feature_names = Vec::new();
    let mut feature_columns: Vec<Vec<f64>> = Vec::new();
    for column in table.columns {
        match column.data {
            ColumnData::Numeric(values) => {
                report.filled_missing += values.iter().filter(|v| v.is_none()).count();
                feature_names.push(column.name);
                feature_columns.push(values.into_iter().map(|v| v.unwrap_or(0.0)).collect());
            }
            ColumnData::Text(_) => report.dropped_columns.push(column.name),
        }
    }

    if report.filled_missing > 0 {
        warn!("Missing values detected: {} cells replaced with 0", report.filled_missing);
    }
    if !report.dropped_columns.is_empty() {
        warn!("Non-numeric columns ignored: {:?}", report.dropped_columns);
    }
    if feature_names.is_empty() {
        return Err(SchemaError::NoFeatureColumns);
    }

    let ids = match block_ids {
        Some(column) => block_ids_from(column.data),
        None => {
            report.synthesized_block_ids = true;
            (0..rows).map(BlockId::sequential).collect()
        }
    };

    let unique: HashSet<&BlockId> = ids.iter().collect();
    if unique.len() != ids.len() {
        warn!("{} duplicate BlockId values in input", ids.len() - unique.len());
    }

    let records = ids
        .into_iter()
        .enumerate()
        .map(|(row, block_id)| LogRecord {
            block_id,
            features: feature_columns.iter().map(|col| col[row]).collect(),
        })
        .collect();

    info!(
        "Normalized {} rows from {} table(s) into {} feature columns",
        rows,
        source_tables,
        feature_names.len()
    );

    Ok(NormalizedBatch {
        feature_names,
        records,
        report,
    })
}

/// Tables read from files always carry the key as text; a numeric key only
/// comes from tables built in memory.
fn block_ids_from(data: ColumnData) -> Vec<BlockId> {
    match data {
        ColumnData::Numeric(values) => values
            .into_iter()
            .map(|v| BlockId::new(render_id(v.unwrap_or(0.0))))
            .collect(),
        ColumnData::Text(values) => values
            .into_iter()
            .map(|v| BlockId::new(v.unwrap_or_else(|| "0".to_string())))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(source: &str, columns: Vec<Column>) -> Table {
        Table::new(source, columns).unwrap()
    }

    #[test]
    fn concatenation_preserves_file_then_row_order() {
        let a = table("a", vec![Column::numeric("x", vec![Some(1.0), Some(2.0)])]);
        let b = table("b", vec![Column::numeric("x", vec![Some(3.0)])]);

        let batch = normalize(vec![a, b]).unwrap();
        assert_eq!(batch.records.len(), 3);
        let xs: Vec<f64> = batch.records.iter().map(|r| r.features[0]).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
        let ids: Vec<&str> = batch.records.iter().map(|r| r.block_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(batch.report.synthesized_block_ids);
        assert_eq!(batch.report.source_tables, 2);
    }

    #[test]
    fn later_tables_are_reordered_to_first_column_order() {
        let a = table(
            "a",
            vec![
                Column::numeric("x", vec![Some(1.0)]),
                Column::numeric("y", vec![Some(10.0)]),
            ],
        );
        let b = table(
            "b",
            vec![
                Column::numeric("y", vec![Some(20.0)]),
                Column::numeric("x", vec![Some(2.0)]),
            ],
        );

        let batch = normalize(vec![a, b]).unwrap();
        assert_eq!(batch.feature_names, vec!["x", "y"]);
        assert_eq!(batch.records[1].features, vec![2.0, 20.0]);
    }

    #[test]
    fn incompatible_column_sets_fail() {
        let a = table("a", vec![Column::numeric("x", vec![Some(1.0)])]);
        let b = table("b", vec![Column::numeric("z", vec![Some(1.0)])]);

        let err = normalize(vec![a, b]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::IncompatibleColumns {
                index: 1,
                expected: vec!["x".into()],
                found: vec!["z".into()],
            }
        );
    }

    #[test]
    fn missing_values_become_zero_and_are_counted() {
        let t = table(
            "a",
            vec![Column::numeric("x", vec![Some(1.0), None, None])],
        );
        let batch = normalize(vec![t]).unwrap();
        assert_eq!(batch.report.filled_missing, 2);
        assert_eq!(batch.records[1].features, vec![0.0]);
        assert_eq!(batch.records[2].features, vec![0.0]);
    }

    #[test]
    fn text_columns_are_dropped_and_reported() {
        let t = table(
            "a",
            vec![
                Column::numeric("x", vec![Some(1.0)]),
                Column::text("host", vec![Some("node-1".into())]),
            ],
        );
        let batch = normalize(vec![t]).unwrap();
        assert_eq!(batch.feature_names, vec!["x"]);
        assert_eq!(batch.report.dropped_columns, vec!["host"]);
    }

    #[test]
    fn column_numeric_in_one_file_and_text_in_another_is_dropped() {
        let a = table(
            "a",
            vec![
                Column::numeric("x", vec![Some(1.0)]),
                Column::numeric("y", vec![Some(1.0)]),
            ],
        );
        let b = table(
            "b",
            vec![
                Column::numeric("x", vec![Some(2.0)]),
                Column::text("y", vec![Some("n/a".into())]),
            ],
        );
        let batch = normalize(vec![a, b]).unwrap();
        assert_eq!(batch.feature_names, vec!["x"]);
        assert_eq!(batch.report.dropped_columns, vec!["y"]);
    }

    #[test]
    fn no_numeric_columns_is_a_schema_error() {
        let t = table("a", vec![Column::text("msg", vec![Some("boot".into())])]);
        assert_eq!(normalize(vec![t]).unwrap_err(), SchemaError::NoFeatureColumns);
    }

    #[test]
    fn block_id_only_is_not_a_feature() {
        let t = table("a", vec![Column::numeric("BlockId", vec![Some(5.0)])]);
        assert_eq!(normalize(vec![t]).unwrap_err(), SchemaError::NoFeatureColumns);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(normalize(vec![]).unwrap_err(), SchemaError::EmptyInput);
        let t = table("a", vec![Column::numeric("x", vec![])]);
        assert_eq!(normalize(vec![t]).unwrap_err(), SchemaError::EmptyInput);
    }

    #[test]
    fn supplied_block_ids_are_kept_as_keys() {
        let t = table(
            "a",
            vec![
                Column::numeric("x", vec![Some(1.0), Some(2.0)]),
                Column::numeric("BlockId", vec![Some(7.0), Some(9.0)]),
            ],
        );
        let batch = normalize(vec![t]).unwrap();
        assert!(!batch.report.synthesized_block_ids);
        assert_eq!(batch.width(), 1);
        assert_eq!(batch.records[0].block_id.as_str(), "7");
        assert_eq!(batch.records[1].block_id.as_str(), "9");
    }

    #[test]
    fn textual_block_ids_survive_the_numeric_filter() {
        let t = table(
            "a",
            vec![
                Column::text("BlockId", vec![Some("blk_-1608999687919862906".into()), None]),
                Column::numeric("x", vec![Some(1.0), Some(2.0)]),
            ],
        );
        let batch = normalize(vec![t]).unwrap();
        assert!(batch.report.dropped_columns.is_empty());
        assert_eq!(batch.records[0].block_id.as_str(), "blk_-1608999687919862906");
        assert_eq!(batch.records[1].block_id.as_str(), "0");
    }
}
