//! Typed, column-oriented view of one input table.
//!
//! Every column is either numeric (any integer or float type, nulls kept as
//! `None`) or text (everything else). The type is fixed when the table is
//! built from Arrow data and drives the normalizer's drop/keep decision.
//! The `BlockId` key column is always text so integer ids stay exact.

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use sentinel_core::{SentinelError, BLOCK_ID_COLUMN};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }

    /// Convert to text, rendering numbers with `to_string`.
    pub fn into_text(self) -> Vec<Option<String>> {
        match self {
            ColumnData::Text(v) => v,
            ColumnData::Numeric(v) => v.into_iter().map(|x| x.map(|n| n.to_string())).collect(),
        }
    }

    /// Append `other`. Numeric stays numeric; any text side widens the whole
    /// column to text.
    pub fn append(&mut self, other: ColumnData) {
        match (self.is_numeric(), other) {
            (true, ColumnData::Numeric(b)) => {
                if let ColumnData::Numeric(a) = self {
                    a.extend(b);
                }
            }
            (_, other) => {
                let mut text = std::mem::replace(self, ColumnData::Text(Vec::new())).into_text();
                text.extend(other.into_text());
                *self = ColumnData::Text(text);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Where the table came from (file path, or a label in tests).
    pub source: String,
    pub columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Build a table, checking every column has the same length.
    pub fn new(source: impl Into<String>, columns: Vec<Column>) -> Result<Self, SentinelError> {
        let source = source.into();
        let rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.data.len() != rows) {
            return Err(SentinelError::Parse {
                path: source,
                reason: format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.data.len(),
                    rows
                ),
            });
        }
        Ok(Self {
            source,
            columns,
            rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Remove and return a column by name.
    pub fn take_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// Build a table from Arrow record batches sharing `schema`.
    pub fn from_record_batches(
        source: impl Into<String>,
        schema: &Schema,
        batches: impl IntoIterator<Item = RecordBatch>,
    ) -> Result<Self, SentinelError> {
        let source = source.into();
        let mut columns: Vec<Column> = schema
            .fields()
            .iter()
            .map(|f| Column {
                name: f.name().clone(),
                data: if f.name() != BLOCK_ID_COLUMN && is_numeric_type(f.data_type()) {
                    ColumnData::Numeric(Vec::new())
                } else {
                    ColumnData::Text(Vec::new())
                },
            })
            .collect();

        for batch in batches {
            for (i, column) in columns.iter_mut().enumerate() {
                let array = batch.column(i);
                let data = if column.name == BLOCK_ID_COLUMN {
                    key_column_data(array)
                } else {
                    column_data(array)
                };
                let data = data.map_err(|e| SentinelError::Parse {
                    path: source.clone(),
                    reason: format!("column '{}': {e}", column.name),
                })?;
                column.data.append(data);
            }
        }

        Self::new(source, columns)
    }
}

/// Integer and float columns count as numeric; so does an all-null column.
/// Booleans, strings, dates and the rest are text.
pub fn is_numeric_type(data_type: &DataType) -> bool {
    data_type.is_numeric() || matches!(data_type, DataType::Null)
}

fn column_data(array: &ArrayRef) -> Result<ColumnData, ArrowError> {
    if is_numeric_type(array.data_type()) {
        Ok(ColumnData::Numeric(float_values(array)?))
    } else {
        Ok(ColumnData::Text(string_values(array)?))
    }
}

/// Key cells as text. Integer ids go through Arrow's exact string cast;
/// float ids are rendered by [`render_id`].
fn key_column_data(array: &ArrayRef) -> Result<ColumnData, ArrowError> {
    if array.data_type().is_floating() {
        let ids = float_values(array)?
            .into_iter()
            .map(|v| v.map(render_id))
            .collect();
        Ok(ColumnData::Text(ids))
    } else {
        Ok(ColumnData::Text(string_values(array)?))
    }
}

/// Whole numbers render without a fractional part, so `7.0` becomes `7`.
pub fn render_id(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

fn float_values(array: &ArrayRef) -> Result<Vec<Option<f64>>, ArrowError> {
    let floats = cast(array, &DataType::Float64)?;
    let floats = floats
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| ArrowError::CastError("expected Float64 array".into()))?;
    Ok(floats.iter().collect())
}

fn string_values(array: &ArrayRef) -> Result<Vec<Option<String>>, ArrowError> {
    let strings = cast(array, &DataType::Utf8)?;
    let strings = strings
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ArrowError::CastError("expected Utf8 array".into()))?;
    Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
}
