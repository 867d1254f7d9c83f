use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading or reshaping a ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The input file could not be opened.
    #[error("CSV file not found at {path}: {source}")]
    DataSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input had no header row, so there are no columns to load.
    #[error("CSV file is empty: {0}")]
    EmptyData(String),

    /// The CSV reader rejected the input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column does not have one cell per ledger row.
    #[error("column {label} has {actual} values, ledger has {expected} rows")]
    ColumnLength {
        label: String,
        expected: usize,
        actual: usize,
    },

    /// An amount column holds data that cannot be coerced to numbers.
    #[error("column {label} cannot be read as amounts: {reason}")]
    AmountColumn { label: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
