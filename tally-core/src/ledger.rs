//! Column-oriented in-memory ledger.
//!
//! A ledger is a list of labelled columns that all hold the same number of
//! cells. Cells are nullable and typed per column: text as loaded, or dates
//! and numbers once coerced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Text,
    Date,
    Number,
}

/// Typed cells of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Text(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
    Number(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn zeros(len: usize) -> Self {
        ColumnData::Number(vec![Some(0.0); len])
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Text(_) => ColumnKind::Text,
            ColumnData::Date(_) => ColumnKind::Date,
            ColumnData::Number(_) => ColumnKind::Number,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Date(v) => v.len(),
            ColumnData::Number(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnData::Text(v) => v[row].is_none(),
            ColumnData::Date(v) => v[row].is_none(),
            ColumnData::Number(v) => v[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    /// True when every cell is null. Vacuously true for a zero-length column.
    pub fn all_null(&self) -> bool {
        self.null_count() == self.len()
    }

    /// Cell rendered as text, `None` for a null cell.
    pub fn display(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Text(v) => v[row].clone(),
            ColumnData::Date(v) => v[row].map(|d| d.format("%Y-%m-%d").to_string()),
            ColumnData::Number(v) => v[row].map(|n| n.to_string()),
        }
    }

    fn retain(&mut self, keep: &[bool]) {
        fn filter<T>(v: &mut Vec<T>, keep: &[bool]) {
            let mut i = 0;
            v.retain(|_| {
                let k = keep[i];
                i += 1;
                k
            });
        }
        match self {
            ColumnData::Text(v) => filter(v, keep),
            ColumnData::Date(v) => filter(v, keep),
            ColumnData::Number(v) => filter(v, keep),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub label: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(label: impl Into<String>, data: ColumnData) -> Self {
        Self {
            label: label.into(),
            data,
        }
    }
}

/// The in-memory table of transaction records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ledger {
    columns: Vec<Column>,
    rows: usize,
}

impl Ledger {
    /// Build a ledger from `columns`, which must all have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        for c in &columns {
            check_len(&c.label, rows, c.data.len())?;
        }
        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    /// Index of the column whose trimmed label equals `label`.
    pub fn position(&self, label: &str) -> Option<usize> {
        let wanted = label.trim();
        self.columns.iter().position(|c| c.label.trim() == wanted)
    }

    pub fn column(&self, label: &str) -> Option<&Column> {
        self.position(label).map(|i| &self.columns[i])
    }

    pub fn dates(&self, label: &str) -> Option<&[Option<NaiveDate>]> {
        match &self.column(label)?.data {
            ColumnData::Date(v) => Some(v),
            _ => None,
        }
    }

    pub fn numbers(&self, label: &str) -> Option<&[Option<f64>]> {
        match &self.column(label)?.data {
            ColumnData::Number(v) => Some(v),
            _ => None,
        }
    }

    /// Append a column. A ledger without columns adopts its length.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.columns.is_empty() {
            self.rows = column.data.len();
        }
        check_len(&column.label, self.rows, column.data.len())?;
        self.columns.push(column);
        Ok(())
    }

    /// Swap the cells of column `index` for `data`.
    pub fn replace_data(&mut self, index: usize, data: ColumnData) -> Result<()> {
        let column = &mut self.columns[index];
        check_len(&column.label, self.rows, data.len())?;
        column.data = data;
        Ok(())
    }

    /// Keep only the rows where `keep` is true.
    pub fn retain_rows(&mut self, keep: &[bool]) -> Result<()> {
        check_len("row mask", self.rows, keep.len())?;
        for c in &mut self.columns {
            c.data.retain(keep);
        }
        self.rows = keep.iter().filter(|&&k| k).count();
        Ok(())
    }

    /// Strip leading and trailing whitespace from every column label.
    pub fn trim_labels(&mut self) {
        for c in &mut self.columns {
            let trimmed = c.label.trim();
            if trimmed.len() != c.label.len() {
                c.label = trimmed.to_string();
            }
        }
    }
}

fn check_len(label: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(LedgerError::ColumnLength {
            label: label.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}
