use thiserror::Error;

/// Ingestion-time problems. Fatal to the batch: no partial results are produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("no input rows to analyze")]
    EmptyInput,

    #[error("no numeric feature columns remain after dropping non-numeric columns")]
    NoFeatureColumns,

    #[error("input table {index} has columns {found:?}, expected {expected:?}")]
    IncompatibleColumns {
        index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("model expects {expected} feature columns, input has {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("failed to load model: {0}")]
    Load(String),

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("reconstruction has width {found}, expected {expected}")]
    OutputWidth { expected: usize, found: usize },
}

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("failed to read table {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("export error: {0}")]
    Export(String),
}
